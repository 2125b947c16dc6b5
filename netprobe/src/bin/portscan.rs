use anyhow::Result;
use clap::Parser;
use netprobe::{args, bootstrap, output, runtime};
use port_scan::{scan, PortScanRequest, DEFAULT_TIMEOUT};
use std::process::ExitCode;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "portscan", version, about = "TCP connect scan of one target")]
struct Cli {
    /// Target hostname or IP
    target: String,
    /// e.g. 80, 80,443, 1-1024 or all
    port_spec: String,
    /// Per-port timeout in seconds
    timeout: Option<u64>,
    /// Upper bound on simultaneous connections
    max_concurrent: Option<usize>,
}

fn main() -> ExitCode {
    let cli: Cli = args::parse_or_exit(std::env::args_os());
    output::finish(run(cli))
}

fn run(cli: Cli) -> Result<()> {
    let cfg = bootstrap().portscan.unwrap_or_default();
    let mut req = PortScanRequest::new(&cli.target, &cli.port_spec)?
        .timeout(args::seconds(cli.timeout, cfg.timeout_secs, DEFAULT_TIMEOUT));
    if let Some(n) = cli.max_concurrent.or(cfg.max_concurrent).filter(|&n| n > 0) {
        req = req.max_concurrent(n);
    }
    if let Some(ms) = cfg.banner_timeout_ms {
        req = req.banner_timeout(Duration::from_millis(ms));
    }
    if let Some(n) = cfg.chunk_size {
        req = req.chunk_size(n);
    }
    let summary = runtime()?.block_on(scan(&req));
    output::emit(&summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_arguments() {
        let cli = Cli::try_parse_from(["portscan", "127.0.0.1", "1-1024", "1", "200"]).unwrap();
        assert_eq!(cli.port_spec, "1-1024");
        assert_eq!(cli.timeout, Some(1));
        assert_eq!(cli.max_concurrent, Some(200));
    }

    #[test]
    fn bad_spec_names_the_token() {
        let cli = Cli::try_parse_from(["portscan", "127.0.0.1", "70000"]).unwrap();
        let err = PortScanRequest::new(&cli.target, &cli.port_spec).unwrap_err();
        assert!(err.to_string().contains("\"70000\""));
    }
}
