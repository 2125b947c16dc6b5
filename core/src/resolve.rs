//! Forward resolution through the system resolver, bounded by a deadline.

use crate::{ProbeError, Result};
use std::net::IpAddr;
use std::time::Duration;
use tokio::net::lookup_host;
use tokio::time::timeout;
use tracing::debug;

/// Resolve `host` to one IP address, preferring IPv4. IP literals are
/// returned without a lookup.
pub async fn resolve_ip(host: &str, deadline: Duration) -> Result<IpAddr> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }
    let lookup = timeout(deadline, lookup_host((host, 0u16)))
        .await
        .map_err(|_| ProbeError::Resolve { host: host.to_string(), reason: format!("timed out after {:?}", deadline) })?
        .map_err(|e| ProbeError::Resolve { host: host.to_string(), reason: e.to_string() })?;
    let addrs: Vec<IpAddr> = lookup.map(|sa| sa.ip()).collect();
    debug!(host, count = addrs.len(), "resolved");
    addrs
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| ProbeError::Resolve { host: host.to_string(), reason: "no addresses".into() })
}
