//! `traceroute`/`tracert` command lines and per-line hop parsers.

use crate::platform::Os;
use std::net::IpAddr;

/// One hop line as printed by the tool, before statistics are applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedHop {
    pub index: u32,
    pub address: Option<String>,
    pub hostname: Option<String>,
    pub samples: Vec<f64>,
    pub timeouts: u32,
}

pub trait TraceParser: Send + Sync {
    /// Parse one transcript line; headers and noise yield `None`.
    fn parse_line(&self, line: &str) -> Option<ParsedHop>;

    fn parse(&self, output: &str) -> Vec<ParsedHop> {
        output.lines().filter_map(|l| self.parse_line(l)).collect()
    }
}

/// Linux and BSD/macOS `traceroute`.
#[derive(Debug, Default)]
pub struct UnixTraceParser;

/// Windows `tracert`.
#[derive(Debug, Default)]
pub struct WindowsTraceParser;

pub fn trace_parser(os: Os) -> &'static dyn TraceParser {
    static UNIX: UnixTraceParser = UnixTraceParser;
    static WINDOWS: WindowsTraceParser = WindowsTraceParser;
    match os {
        Os::Windows => &WINDOWS,
        _ => &UNIX,
    }
}

/// Program and arguments for tracing to `target` on `os`.
pub fn traceroute_command(os: Os, max_hops: u32, probes: u32, numeric: bool, target: &str) -> (&'static str, Vec<String>) {
    if os.is_windows() {
        let mut args = vec!["-h".to_string(), max_hops.to_string(), "-w".to_string(), "1000".to_string()];
        if numeric {
            args.push("-d".into());
        }
        args.push(target.to_string());
        return ("tracert", args);
    }
    let mut args = vec![
        "-m".to_string(),
        max_hops.to_string(),
        "-q".to_string(),
        probes.to_string(),
        "-w".to_string(),
        "1".to_string(),
    ];
    if numeric {
        args.push("-n".into());
    }
    args.push(target.to_string());
    ("traceroute", args)
}

fn hop_index(tokens: &[&str]) -> Option<u32> {
    tokens.first()?.parse::<u32>().ok().filter(|&i| i > 0)
}

fn unwrap_delimited<'a>(token: &'a str, open: char, close: char) -> Option<&'a str> {
    token.strip_prefix(open)?.strip_suffix(close)
}

impl TraceParser for UnixTraceParser {
    fn parse_line(&self, line: &str) -> Option<ParsedHop> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let mut hop = ParsedHop { index: hop_index(&tokens)?, ..ParsedHop::default() };
        let mut i = 1;
        while i < tokens.len() {
            let tok = tokens[i];
            let next = tokens.get(i + 1).copied();
            if tok == "*" {
                hop.timeouts += 1;
            } else if next == Some("ms") && tok.parse::<f64>().is_ok() {
                hop.samples.push(tok.parse().unwrap_or_default());
                i += 1;
            } else if tok.starts_with('!') {
                // ICMP annotations such as !H or !N
            } else if let Some(inner) = unwrap_delimited(tok, '(', ')') {
                if hop.address.is_none() {
                    hop.address = Some(inner.to_string());
                }
            } else if hop.address.is_none() && hop.hostname.is_none() {
                if tok.parse::<IpAddr>().is_ok() {
                    hop.address = Some(tok.to_string());
                } else {
                    hop.hostname = Some(tok.to_string());
                }
            }
            i += 1;
        }
        // A hostname printed without a parenthesised address is all we have.
        if hop.address.is_none() {
            hop.address = hop.hostname.take();
        }
        Some(hop)
    }
}

impl TraceParser for WindowsTraceParser {
    fn parse_line(&self, line: &str) -> Option<ParsedHop> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let mut hop = ParsedHop { index: hop_index(&tokens)?, ..ParsedHop::default() };
        let mut i = 1;
        while i < tokens.len() {
            let tok = tokens[i];
            let next = tokens.get(i + 1).copied();
            if tok == "*" {
                hop.timeouts += 1;
            } else if next == Some("ms") {
                if let Ok(v) = tok.trim_start_matches('<').parse::<f64>() {
                    hop.samples.push(v);
                }
                i += 1;
            } else if tok == "Request" {
                break;
            } else if let Some(inner) = unwrap_delimited(tok, '[', ']') {
                hop.address = Some(inner.to_string());
            } else if hop.address.is_none() && hop.hostname.is_none() {
                if tok.parse::<IpAddr>().is_ok() {
                    hop.address = Some(tok.to_string());
                } else {
                    hop.hostname = Some(tok.to_string());
                }
            }
            i += 1;
        }
        if hop.address.is_none() {
            hop.address = hop.hostname.take();
        }
        Some(hop)
    }
}
