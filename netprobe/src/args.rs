//! Positional-argument helpers shared by the executables.

use clap::error::ErrorKind;
use clap::Parser;
use netprobe_core::{ProbeError, Result};
use std::ffi::OsString;
use std::time::Duration;

/// Parse argv with clap. Help and version print as usual; any other parse
/// failure becomes `{"error": ...}` on stdout and exit code 1.
pub fn parse_or_exit<P: Parser>(argv: impl IntoIterator<Item = OsString>) -> P {
    match P::try_parse_from(argv) {
        Ok(p) => p,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            println!("{}", crate::output::error_line(&clap_message(&e)));
            std::process::exit(1)
        }
    }
}

/// First line of a clap error without the `error: ` prefix.
pub fn clap_message(e: &clap::Error) -> String {
    let text = e.to_string();
    let first = text.lines().next().unwrap_or_default();
    first.strip_prefix("error: ").unwrap_or(first).trim().to_string()
}

/// Rewrite `-name` to `--name` for the given long flags so both spellings
/// parse. Everything after `--` is left alone.
pub fn normalize_single_dash(argv: impl IntoIterator<Item = OsString>, long_flags: &[&str]) -> Vec<OsString> {
    let mut passthrough = false;
    argv.into_iter()
        .map(|arg| {
            if passthrough {
                return arg;
            }
            let Some(s) = arg.to_str() else { return arg };
            if s == "--" {
                passthrough = true;
                return arg;
            }
            match s.strip_prefix('-') {
                Some(rest) if !rest.starts_with('-') => {
                    let name = rest.split('=').next().unwrap_or(rest);
                    if long_flags.contains(&name) {
                        OsString::from(format!("-{s}"))
                    } else {
                        arg
                    }
                }
                _ => arg,
            }
        })
        .collect()
}

/// Ports in the order given, e.g. `22,80,443`. Ranges are not accepted here.
pub fn parse_port_list(spec: &str) -> Result<Vec<u16>> {
    let mut ports = Vec::new();
    for token in spec.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let port = token
            .parse::<u16>()
            .ok()
            .filter(|&p| p > 0)
            .ok_or_else(|| ProbeError::port_token(token, "out of range 1-65535"))?;
        if !ports.contains(&port) {
            ports.push(port);
        }
    }
    if ports.is_empty() {
        return Err(ProbeError::EmptyPortList);
    }
    Ok(ports)
}

/// Comma-separated targets or domains, blanks dropped.
pub fn split_list(arg: &str) -> Vec<String> {
    arg.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}

/// `true` or `1`; anything else is false.
pub fn parse_flag_word(word: &str) -> bool {
    matches!(word.trim(), "true" | "1")
}

pub fn seconds(arg: Option<u64>, configured: Option<u64>, default: Duration) -> Duration {
    arg.or(configured).filter(|&s| s > 0).map(Duration::from_secs).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn single_dash_long_flags() {
        let out = normalize_single_dash(os(&["net-grab", "-json", "-live", "-v", "-p", "22", "--", "-json"]), &["json", "live"]);
        assert_eq!(out, os(&["net-grab", "--json", "--live", "-v", "-p", "22", "--", "-json"]));
        assert_eq!(normalize_single_dash(os(&["x", "--json"]), &["json"]), os(&["x", "--json"]));
    }

    #[test]
    fn port_lists_keep_order() {
        assert_eq!(parse_port_list("443,22,80,22").unwrap(), vec![443, 22, 80]);
        let e = parse_port_list("22,70000").unwrap_err();
        assert!(e.to_string().contains("\"70000\""));
        assert!(parse_port_list("0").is_err());
        assert!(matches!(parse_port_list(" , "), Err(ProbeError::EmptyPortList)));
    }

    #[test]
    fn words_and_lists() {
        assert!(parse_flag_word("true") && parse_flag_word("1"));
        assert!(!parse_flag_word("yes"));
        assert_eq!(split_list("a.com, b.com,,"), vec!["a.com", "b.com"]);
        assert_eq!(seconds(None, Some(3), Duration::from_secs(5)), Duration::from_secs(3));
        assert_eq!(seconds(Some(0), None, Duration::from_secs(5)), Duration::from_secs(5));
        assert_eq!(seconds(Some(2), Some(3), Duration::from_secs(5)), Duration::from_secs(2));
    }
}
