use anyhow::{Context, Result};
use clap::Parser;
use host_sweep::{sweep, JsonSink, LiveSink, SweepConfig, SweepSink};
use netprobe::config::SweepSection;
use netprobe::{args, bootstrap, output, runtime};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

const LONG_FLAGS: &[&str] = &["live", "json", "verbose"];

#[derive(Debug, Parser)]
#[command(name = "net-grab", version, about = "Ping, resolve and port-scan every host in a CIDR block")]
struct Cli {
    /// Print a detailed block per host
    #[arg(short, long)]
    verbose: bool,
    /// Show a progress line while scanning
    #[arg(long)]
    live: bool,
    /// Print the results as one JSON array instead of a transcript
    #[arg(long)]
    json: bool,
    /// Ports to scan on reachable hosts, e.g. 80,443 or 1-1024
    #[arg(short = 'p', value_name = "PORTS")]
    ports: Option<String>,
    /// Block to sweep, e.g. 192.168.1.0/24
    cidr: String,
}

fn main() -> ExitCode {
    let argv = args::normalize_single_dash(std::env::args_os(), LONG_FLAGS);
    let cli: Cli = args::parse_or_exit(argv);
    output::finish(run(cli))
}

fn sweep_config(cli: &Cli, section: &SweepSection) -> Result<SweepConfig> {
    let mut cfg = SweepConfig::default();
    match (cli.ports.as_deref(), section.ports.as_deref()) {
        (Some(spec), _) => cfg = cfg.with_port_spec(spec)?,
        (None, Some(spec)) => cfg = cfg.with_port_spec(spec).context("sweep.ports in config")?,
        (None, None) => {}
    }
    if let Some(n) = section.workers.filter(|&n| n > 0) {
        cfg.workers = n;
    }
    if let Some(n) = section.max_hosts.filter(|&n| n > 0) {
        cfg.max_hosts = n.min(host_sweep::MAX_HOSTS);
    }
    if let Some(n) = section.ping_count.filter(|&n| n > 0) {
        cfg.ping.count = n;
    }
    if let Some(ms) = section.ping_interval_ms {
        cfg.ping.interval = Duration::from_millis(ms);
    }
    if let Some(ms) = section.ping_timeout_ms {
        cfg.ping.timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = section.dns_timeout_ms {
        cfg.dns_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = section.port_timeout_ms {
        cfg.port_timeout = Duration::from_millis(ms);
    }
    Ok(cfg)
}

fn run(cli: Cli) -> Result<()> {
    let section = bootstrap().sweep.unwrap_or_default();
    let cfg = sweep_config(&cli, &section)?;
    let sink: Arc<dyn SweepSink> =
        if cli.json { Arc::new(JsonSink) } else { Arc::new(LiveSink::new(cli.verbose, cli.live)) };
    runtime()?.block_on(sweep(&cli.cidr, &cfg, sink))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    fn parse(argv: &[&str]) -> Cli {
        let argv: Vec<OsString> = argv.iter().map(OsString::from).collect();
        Cli::try_parse_from(args::normalize_single_dash(argv, LONG_FLAGS)).unwrap()
    }

    #[test]
    fn single_dash_flags() {
        let cli = parse(&["net-grab", "-json", "203.0.113.0/31"]);
        assert!(cli.json && !cli.live && !cli.verbose);
        assert_eq!(cli.cidr, "203.0.113.0/31");
        let cli = parse(&["net-grab", "-v", "-live", "-p", "22,80", "10.0.0.0/30"]);
        assert!(cli.verbose && cli.live);
        assert_eq!(cli.ports.as_deref(), Some("22,80"));
    }

    #[test]
    fn bare_invocation_is_compact_without_progress() {
        let cli = parse(&["net-grab", "203.0.113.0/31"]);
        assert!(!cli.verbose);
        assert!(!cli.live);
        assert!(!cli.json);
        assert!(cli.ports.is_none());
    }

    #[test]
    fn config_merge() {
        let cli = parse(&["net-grab", "10.0.0.0/30"]);
        let section = SweepSection { ports: Some("443".into()), workers: Some(4), ping_count: Some(1), ..Default::default() };
        let cfg = sweep_config(&cli, &section).unwrap();
        assert_eq!(cfg.ports, vec![443]);
        assert_eq!(cfg.workers, 4);
        assert_eq!(cfg.ping.count, 1);

        let cli = parse(&["net-grab", "-p", "22", "10.0.0.0/30"]);
        assert_eq!(sweep_config(&cli, &section).unwrap().ports, vec![22]);
        let cli = parse(&["net-grab", "-p", "99999", "10.0.0.0/30"]);
        assert!(sweep_config(&cli, &SweepSection::default()).is_err());
    }
}
