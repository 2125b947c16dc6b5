use anyhow::Result;
use clap::Parser;
use netprobe::{args, bootstrap, output, runtime};
use std::process::ExitCode;
use traceroute::{trace_many, TraceRequest, DEFAULT_MAX_HOPS, DEFAULT_TIMEOUT};

#[derive(Debug, Parser)]
#[command(name = "traceroute", version, about = "Trace the path to one or more targets")]
struct Cli {
    /// target or target1,target2,...
    targets: String,
    /// Maximum TTL
    max_hops: Option<u32>,
    /// Per-target timeout in seconds
    timeout: Option<u64>,
    /// `true` or `1` skips reverse DNS
    numeric: Option<String>,
}

fn main() -> ExitCode {
    let cli: Cli = args::parse_or_exit(std::env::args_os());
    output::finish(run(cli))
}

fn request(cli: &Cli, cfg: &netprobe::config::TracerouteConfig) -> Result<TraceRequest> {
    let targets = args::split_list(&cli.targets);
    anyhow::ensure!(!targets.is_empty(), "no targets given");
    let numeric = match cli.numeric.as_deref() {
        Some(word) => args::parse_flag_word(word),
        None => cfg.numeric.unwrap_or(false),
    };
    Ok(TraceRequest::new(targets)
        .max_hops(cli.max_hops.or(cfg.max_hops).filter(|&n| n > 0).unwrap_or(DEFAULT_MAX_HOPS))
        .timeout(args::seconds(cli.timeout, cfg.timeout_secs, DEFAULT_TIMEOUT))
        .numeric(numeric))
}

fn run(cli: Cli) -> Result<()> {
    let cfg = bootstrap().traceroute.unwrap_or_default();
    let req = request(&cli, &cfg)?;
    let rt = runtime()?;
    if req.targets.len() == 1 {
        output::emit(&rt.block_on(traceroute::trace_one(&req.targets[0], req.max_hops, req.timeout, req.numeric)))
    } else {
        output::emit(&rt.block_on(trace_many(&req)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netprobe::config::TracerouteConfig;
    use std::time::Duration;

    #[test]
    fn positional_arguments() {
        let cli = Cli::try_parse_from(["traceroute", "127.0.0.1", "5", "10", "true"]).unwrap();
        let req = request(&cli, &TracerouteConfig::default()).unwrap();
        assert_eq!(req.targets, vec!["127.0.0.1"]);
        assert_eq!(req.max_hops, 5);
        assert_eq!(req.timeout, Duration::from_secs(10));
        assert!(req.numeric);
    }

    #[test]
    fn defaults_and_lists() {
        let cli = Cli::try_parse_from(["traceroute", "a.example,b.example"]).unwrap();
        let req = request(&cli, &TracerouteConfig::default()).unwrap();
        assert_eq!(req.targets.len(), 2);
        assert_eq!(req.max_hops, 30);
        assert_eq!(req.timeout, Duration::from_secs(60));
        assert!(!req.numeric);
        let cli = Cli::try_parse_from(["traceroute", ","]).unwrap();
        assert!(request(&cli, &TracerouteConfig::default()).is_err());
    }
}
