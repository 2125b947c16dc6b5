use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::process::ExitCode;

/// Write `value` as exactly one JSON line on stdout.
pub fn emit<T: Serialize>(value: &T) -> Result<()> {
    let line = serde_json::to_string(value).context("serializing result")?;
    let mut out = std::io::stdout().lock();
    writeln!(out, "{line}").context("writing result")?;
    out.flush().context("writing result")
}

pub fn error_line(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

/// Exit 0 on success; otherwise print `{"error": ...}` on stdout and exit 1.
pub fn finish(result: Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "exiting with error");
            println!("{}", error_line(&format!("{e:#}")));
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_line_is_json() {
        let v: serde_json::Value = serde_json::from_str(&error_line("invalid port token \"70000\"")).unwrap();
        assert_eq!(v["error"], "invalid port token \"70000\"");
    }
}
