use ipnet::{IpNet, Ipv4AddrRange, Ipv6AddrRange};
use netprobe_core::{ProbeError, Result};
use std::net::IpAddr;

pub const MAX_HOSTS: usize = 256;

/// Every address in the block, network and broadcast included, ascending,
/// stopping after `cap`. A bare address is a one-host block.
pub fn expand_cidr(input: &str, cap: usize) -> Result<Vec<IpAddr>> {
    let input = input.trim();
    let invalid = |reason: String| ProbeError::Cidr { input: input.to_string(), reason };
    let net: IpNet = match input.parse::<IpNet>() {
        Ok(n) => n.trunc(),
        Err(e) => {
            let ip = input.parse::<IpAddr>().map_err(|_| invalid(e.to_string()))?;
            let prefix = if ip.is_ipv4() { 32 } else { 128 };
            IpNet::new(ip, prefix).map_err(|e| invalid(e.to_string()))?
        }
    };
    let hosts = match net {
        IpNet::V4(n) => Ipv4AddrRange::new(n.network(), n.broadcast()).take(cap).map(IpAddr::V4).collect(),
        IpNet::V6(n) => Ipv6AddrRange::new(n.network(), n.broadcast()).take(cap).map(IpAddr::V6).collect(),
    };
    Ok(hosts)
}
