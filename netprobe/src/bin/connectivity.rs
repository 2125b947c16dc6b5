use anyhow::{Context, Result};
use clap::Parser;
use netprobe::{args, bootstrap, output, runtime};
use reachability::{probe, ProbeMode, ProbeRequest, DEFAULT_ALL_PORTS};
use std::process::ExitCode;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_TCP_PORT: u16 = 80;
const DEFAULT_UDP_PORT: u16 = 53;

#[derive(Debug, Parser)]
#[command(name = "connectivity", version, about = "Check whether a target answers ping, TCP or UDP")]
struct Cli {
    /// Target hostname or IP
    target: String,
    /// ping, tcp, udp or all
    mode: ProbeMode,
    /// One port for tcp/udp, a comma list for all
    ports: Option<String>,
    /// Timeout in seconds
    timeout: Option<u64>,
}

fn main() -> ExitCode {
    let cli: Cli = args::parse_or_exit(std::env::args_os());
    output::finish(run(cli))
}

fn run(cli: Cli) -> Result<()> {
    let cfg = bootstrap().connectivity.unwrap_or_default();
    let timeout = args::seconds(cli.timeout, cfg.timeout_secs, DEFAULT_TIMEOUT);
    let ports = match (cli.ports.as_deref(), cli.mode) {
        (Some(spec), _) => args::parse_port_list(spec)?,
        (None, ProbeMode::Tcp) => vec![DEFAULT_TCP_PORT],
        (None, ProbeMode::Udp) => vec![DEFAULT_UDP_PORT],
        (None, ProbeMode::All) => match cfg.ports.as_deref() {
            Some(spec) => args::parse_port_list(spec).context("connectivity.ports in config")?,
            None => DEFAULT_ALL_PORTS.to_vec(),
        },
        (None, ProbeMode::Ping) => Vec::new(),
    };

    let mut req = ProbeRequest::new(&cli.target, cli.mode, ports, timeout)?;
    if let Some(n) = cfg.concurrency {
        req = req.with_concurrency(n);
    }
    if let Some(n) = cfg.ping_count {
        req = req.with_ping_count(n);
    }
    if let Some(n) = cfg.packet_size {
        req = req.with_packet_size(n);
    }

    let outcome = runtime()?.block_on(probe(&req));
    output::emit(&outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_arguments() {
        let cli = Cli::try_parse_from(["connectivity", "127.0.0.1", "tcp", "22", "2"]).unwrap();
        assert_eq!(cli.target, "127.0.0.1");
        assert_eq!(cli.mode, ProbeMode::Tcp);
        assert_eq!(cli.ports.as_deref(), Some("22"));
        assert_eq!(cli.timeout, Some(2));
    }

    #[test]
    fn optional_tail_and_bad_mode() {
        let cli = Cli::try_parse_from(["connectivity", "example.com", "all"]).unwrap();
        assert!(cli.ports.is_none() && cli.timeout.is_none());
        assert!(Cli::try_parse_from(["connectivity", "example.com", "icmp"]).is_err());
        assert!(Cli::try_parse_from(["connectivity", "example.com"]).is_err());
    }
}
