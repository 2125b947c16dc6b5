//! Optional YAML defaults. Every section and field may be omitted; a
//! positional argument always wins over the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "NETPROBE_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "netprobe.yaml";

#[derive(Debug, Default, Deserialize, Clone)]
pub struct ConnectivityConfig {
    pub timeout_secs: Option<u64>,
    /// Ports for `all` mode, e.g. `22,80,443`.
    pub ports: Option<String>,
    pub concurrency: Option<usize>,
    pub ping_count: Option<u32>,
    pub packet_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct PortscanConfig {
    pub timeout_secs: Option<u64>,
    pub max_concurrent: Option<usize>,
    pub banner_timeout_ms: Option<u64>,
    pub chunk_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct SweepSection {
    pub ports: Option<String>,
    pub workers: Option<usize>,
    pub max_hosts: Option<usize>,
    pub ping_count: Option<u32>,
    pub ping_interval_ms: Option<u64>,
    pub ping_timeout_ms: Option<u64>,
    pub dns_timeout_ms: Option<u64>,
    pub port_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct TracerouteConfig {
    pub max_hops: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub numeric: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct DnsConfig {
    pub server: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: Option<String>,
    /// `compact` (default) or `json`.
    pub format: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct Config {
    pub connectivity: Option<ConnectivityConfig>,
    pub portscan: Option<PortscanConfig>,
    pub sweep: Option<SweepSection>,
    pub traceroute: Option<TracerouteConfig>,
    pub dns: Option<DnsConfig>,
    pub logging: Option<LoggingConfig>,
}

/// `$NETPROBE_CONFIG` if set, else `./netprobe.yaml` when it exists.
pub fn config_path() -> Option<PathBuf> {
    if let Some(p) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(p));
    }
    let p = Path::new(DEFAULT_CONFIG_FILE);
    p.exists().then(|| p.to_path_buf())
}

pub fn parse_config(text: &str) -> Result<Config> {
    serde_yaml::from_str(text).context("malformed config")
}

/// Read and parse `path`. `Ok(None)` when there is no file to read.
pub fn load_config(path: Option<&Path>) -> Result<Option<Config>> {
    let Some(path) = path else { return Ok(None) };
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_config(&text).with_context(|| format!("in {}", path.display())).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_partial_documents() {
        let c = parse_config("{}").unwrap();
        assert!(c.portscan.is_none());
        let c = parse_config("portscan:\n  max_concurrent: 50\nlogging:\n  level: debug\n").unwrap();
        assert_eq!(c.portscan.unwrap().max_concurrent, Some(50));
        assert_eq!(c.logging.unwrap().level.as_deref(), Some("debug"));
    }

    #[test]
    fn every_section_parses() {
        let text = "\
connectivity: { timeout_secs: 3, ports: \"22,443\" }
sweep: { ports: \"22\", workers: 8, ping_count: 2 }
traceroute: { max_hops: 12, numeric: true }
dns: { server: 1.1.1.1, timeout_secs: 4 }
";
        let c = parse_config(text).unwrap();
        assert_eq!(c.connectivity.unwrap().ports.as_deref(), Some("22,443"));
        assert_eq!(c.sweep.unwrap().workers, Some(8));
        assert_eq!(c.traceroute.unwrap().numeric, Some(true));
        assert_eq!(c.dns.unwrap().server.as_deref(), Some("1.1.1.1"));
    }

    #[test]
    fn malformed_is_an_error() {
        assert!(parse_config("portscan: [1, 2").is_err());
        assert!(parse_config("portscan:\n  max_concurrent: lots\n").is_err());
    }

    #[test]
    fn missing_path_is_none_and_unreadable_is_error() {
        assert!(load_config(None).unwrap().is_none());
        assert!(load_config(Some(Path::new("/nonexistent/netprobe.yaml"))).is_err());
    }
}
