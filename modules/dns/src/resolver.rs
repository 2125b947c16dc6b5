//! Resolver construction and reverse lookups.

use std::net::IpAddr;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;
use trust_dns_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

/// Resolver with one attempt per query and `query_timeout` per attempt.
/// `server` replaces the system nameservers with one address on port 53.
pub fn build_resolver(server: Option<IpAddr>, query_timeout: Duration) -> TokioAsyncResolver {
    let (config, mut opts) = match server {
        Some(ip) => (
            ResolverConfig::from_parts(None, vec![], NameServerConfigGroup::from_ips_clear(&[ip], 53, true)),
            ResolverOpts::default(),
        ),
        None => system_config(),
    };
    opts.timeout = query_timeout;
    opts.attempts = 1;
    TokioAsyncResolver::tokio(config, opts)
}

fn system_config() -> (ResolverConfig, ResolverOpts) {
    match trust_dns_resolver::system_conf::read_system_conf() {
        Ok(pair) => pair,
        Err(e) => {
            debug!(error = %e, "system resolver config unreadable, using defaults");
            (ResolverConfig::default(), ResolverOpts::default())
        }
    }
}

pub(crate) fn trim_dot(name: impl ToString) -> String {
    name.to_string().trim_end_matches('.').to_string()
}

/// First PTR name for `ip`, without the trailing dot. Failures and
/// timeouts yield `None`.
pub async fn reverse_lookup(ip: IpAddr, deadline: Duration) -> Option<String> {
    reverse_lookup_all(ip, deadline).await.into_iter().next()
}

/// Every PTR name for `ip`.
pub async fn reverse_lookup_all(ip: IpAddr, deadline: Duration) -> Vec<String> {
    let resolver = build_resolver(None, deadline);
    match timeout(deadline, resolver.reverse_lookup(ip)).await {
        Ok(Ok(lookup)) => lookup.iter().map(trim_dot).filter(|n| !n.is_empty()).collect(),
        Ok(Err(e)) => {
            debug!(%ip, error = %e, "reverse lookup failed");
            Vec::new()
        }
        Err(_) => {
            debug!(%ip, "reverse lookup timed out");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_dot() {
        assert_eq!(trim_dot("mail.example.com."), "mail.example.com");
        assert_eq!(trim_dot("host"), "host");
    }

    #[tokio::test]
    async fn reverse_lookup_respects_deadline() {
        let started = std::time::Instant::now();
        let _ = reverse_lookup("192.0.2.1".parse().unwrap(), Duration::from_millis(300)).await;
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
