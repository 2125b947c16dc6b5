use anyhow::{Context, Result};
use clap::Parser;
use dns::{lookup_many, lookup_one, parse_query_types, DnsRequest, DEFAULT_TIMEOUT};
use netprobe::{args, bootstrap, output, runtime};
use std::net::IpAddr;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "dns", version, about = "Look up DNS records for one or more domains")]
struct Cli {
    /// domain or domain1,domain2,...
    domains: String,
    /// a, aaaa, cname, mx, ns, txt or all; comma-separated
    types: String,
    /// Nameserver IP to query instead of the system resolvers
    server: Option<IpAddr>,
    /// Timeout in seconds
    timeout: Option<u64>,
}

fn main() -> ExitCode {
    let cli: Cli = args::parse_or_exit(std::env::args_os());
    output::finish(run(cli))
}

fn request(cli: &Cli, cfg: &netprobe::config::DnsConfig) -> Result<DnsRequest> {
    let domains = args::split_list(&cli.domains);
    anyhow::ensure!(!domains.is_empty(), "no domains given");
    let server = match (cli.server, cfg.server.as_deref()) {
        (Some(ip), _) => Some(ip),
        (None, Some(s)) => Some(s.parse::<IpAddr>().context("dns.server in config must be an IP address")?),
        (None, None) => None,
    };
    Ok(DnsRequest::new(domains, parse_query_types(&cli.types)?)
        .server(server)
        .timeout(args::seconds(cli.timeout, cfg.timeout_secs, DEFAULT_TIMEOUT)))
}

fn run(cli: Cli) -> Result<()> {
    let cfg = bootstrap().dns.unwrap_or_default();
    let req = request(&cli, &cfg)?;
    let rt = runtime()?;
    if req.domains.len() == 1 {
        output::emit(&rt.block_on(lookup_one(&req, &req.domains[0])))
    } else {
        output::emit(&rt.block_on(lookup_many(&req)))
    }
}
