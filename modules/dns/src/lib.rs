//! Multi-type, multi-domain DNS lookups over trust-dns.

mod query;
mod resolver;

pub use query::{parse_query_types, QueryType};
pub use resolver::{build_resolver, reverse_lookup, reverse_lookup_all};

use netprobe_core::timing::elapsed_ms;
use resolver::trim_dot;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, warn};
use trust_dns_resolver::proto::rr::{RData, RecordType};
use trust_dns_resolver::TokioAsyncResolver;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Extra allowance on top of the per-domain timeout for a multi-domain run.
pub const MULTI_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsResult {
    pub domain: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ipv4: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ipv6: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cname: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mx: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub txt: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub resolve_time_ms: u64,
}

impl DnsResult {
    fn failed(domain: &str, error: impl Into<String>) -> Self {
        DnsResult { domain: domain.to_string(), error: Some(error.into()), ..Default::default() }
    }

    pub fn has_records(&self) -> bool {
        !(self.ipv4.is_empty()
            && self.ipv6.is_empty()
            && self.cname.is_empty()
            && self.mx.is_empty()
            && self.ns.is_empty()
            && self.txt.is_empty())
    }

    /// Counted as a success by multi-domain totals.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.has_records()
    }

    fn absorb(&mut self, qtype: QueryType, records: Vec<String>) {
        let slot = match qtype {
            QueryType::A => &mut self.ipv4,
            QueryType::Aaaa => &mut self.ipv6,
            QueryType::Cname => &mut self.cname,
            QueryType::Mx => &mut self.mx,
            QueryType::Ns => &mut self.ns,
            QueryType::Txt => &mut self.txt,
        };
        *slot = records;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiDnsResult {
    pub results: Vec<DnsResult>,
    pub total_time_ms: u64,
    pub successful: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct DnsRequest {
    pub domains: Vec<String>,
    pub types: Vec<QueryType>,
    pub server: Option<IpAddr>,
    pub timeout: Duration,
}

impl DnsRequest {
    pub fn new(domains: Vec<String>, types: Vec<QueryType>) -> Self {
        DnsRequest { domains, types, server: None, timeout: DEFAULT_TIMEOUT }
    }

    pub fn server(mut self, server: Option<IpAddr>) -> Self {
        self.server = server;
        self
    }

    pub fn timeout(mut self, t: Duration) -> Self {
        self.timeout = t;
        self
    }
}

/// Query every requested type for one domain concurrently.
pub async fn lookup(resolver: &TokioAsyncResolver, domain: &str, types: &[QueryType], deadline: Duration) -> DnsResult {
    let started = Instant::now();
    let mut set = JoinSet::new();
    for &qtype in types {
        let resolver = resolver.clone();
        let name = domain.to_string();
        set.spawn(async move {
            let res = match timeout(deadline, query(&resolver, &name, qtype)).await {
                Ok(r) => r,
                Err(_) => Err(format!("{qtype} query timed out")),
            };
            (qtype, res)
        });
    }

    let mut result = DnsResult { domain: domain.to_string(), ..Default::default() };
    let mut first_error = None;
    let mut answered = 0usize;
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((qtype, Ok(records))) => {
                answered += 1;
                result.absorb(qtype, records);
            }
            Ok((qtype, Err(e))) => {
                debug!(domain, %qtype, error = %e, "query failed");
                first_error.get_or_insert(e);
            }
            Err(e) => warn!(error = %e, "dns task failed"),
        }
    }
    if answered == 0 && !types.is_empty() {
        let e = first_error.unwrap_or_else(|| "no answers".into());
        result.error = Some(format!("all queries failed: {e}"));
    }
    result.resolve_time_ms = elapsed_ms(started);
    result
}

async fn query(resolver: &TokioAsyncResolver, domain: &str, qtype: QueryType) -> Result<Vec<String>, String> {
    let err = |e: trust_dns_resolver::error::ResolveError| e.to_string();
    let records: Vec<String> = match qtype {
        QueryType::A => resolver.ipv4_lookup(domain).await.map_err(err)?.iter().map(|a| a.to_string()).collect(),
        QueryType::Aaaa => resolver.ipv6_lookup(domain).await.map_err(err)?.iter().map(|a| a.to_string()).collect(),
        QueryType::Cname => resolver
            .lookup(domain, RecordType::CNAME)
            .await
            .map_err(err)?
            .iter()
            .filter_map(|rdata| match rdata {
                RData::CNAME(name) => Some(trim_dot(name)),
                _ => None,
            })
            .collect(),
        QueryType::Mx => resolver
            .mx_lookup(domain)
            .await
            .map_err(err)?
            .iter()
            .map(|mx| format!("{} priority={}", trim_dot(mx.exchange()), mx.preference()))
            .collect(),
        QueryType::Ns => resolver.ns_lookup(domain).await.map_err(err)?.iter().map(trim_dot).collect(),
        QueryType::Txt => resolver
            .txt_lookup(domain)
            .await
            .map_err(err)?
            .iter()
            .map(|txt| txt.txt_data().iter().map(|part| String::from_utf8_lossy(part)).collect::<String>())
            .collect(),
    };
    Ok(records)
}

/// Look up one domain with a fresh resolver.
pub async fn lookup_one(req: &DnsRequest, domain: &str) -> DnsResult {
    let resolver = build_resolver(req.server, req.timeout);
    lookup(&resolver, domain, &req.types, req.timeout).await
}

/// Look up every domain concurrently. Domains still pending when the
/// top-level deadline expires report `deadline exceeded`.
pub async fn lookup_many(req: &DnsRequest) -> MultiDnsResult {
    let started = Instant::now();
    let resolver = build_resolver(req.server, req.timeout);
    let mut results: Vec<DnsResult> =
        req.domains.iter().map(|d| DnsResult::failed(d, "deadline exceeded")).collect();

    let mut set = JoinSet::new();
    for (idx, domain) in req.domains.iter().enumerate() {
        let resolver = resolver.clone();
        let domain = domain.clone();
        let types = req.types.clone();
        let per_domain = req.timeout;
        set.spawn(async move { (idx, lookup(&resolver, &domain, &types, per_domain).await) });
    }

    let drain = async {
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, r)) => results[idx] = r,
                Err(e) => warn!(error = %e, "dns task failed"),
            }
        }
    };
    let finished = timeout(req.timeout + MULTI_GRACE, drain).await.is_ok();
    if !finished {
        warn!(pending = set.len(), "dns lookups exceeded top-level deadline");
        set.abort_all();
    }

    let successful = results.iter().filter(|r| r.is_success()).count();
    let failed = results.len() - successful;
    MultiDnsResult { results, total_time_ms: elapsed_ms(started), successful, failed }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_lists_are_omitted() {
        let r = DnsResult {
            domain: "example.com".into(),
            ipv4: vec!["93.184.216.34".into()],
            mx: vec!["mail.example.com priority=10".into()],
            resolve_time_ms: 12,
            ..Default::default()
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["ipv4"][0], "93.184.216.34");
        assert_eq!(v["resolveTimeMs"], 12);
        assert!(v.get("ipv6").is_none());
        assert!(v.get("error").is_none());
        assert!(r.is_success());
    }

    #[test]
    fn failure_is_not_success() {
        let r = DnsResult::failed("nope.invalid", "deadline exceeded");
        assert!(!r.is_success());
        assert!(!r.has_records());
    }

    #[tokio::test]
    async fn unreachable_server_fails_every_query_within_deadline() {
        // TEST-NET-1 has no nameserver; each query times out.
        let req = DnsRequest::new(vec!["example.com".into(), "example.org".into()], vec![QueryType::A, QueryType::Mx])
            .server(Some("192.0.2.53".parse().unwrap()))
            .timeout(Duration::from_millis(300));
        let started = Instant::now();
        let multi = lookup_many(&req).await;
        assert!(started.elapsed() < req.timeout + MULTI_GRACE);
        assert_eq!(multi.results.len(), 2);
        assert_eq!(multi.failed, 2);
        assert_eq!(multi.successful, 0);
        assert_eq!(multi.results[0].domain, "example.com");
        assert!(multi.results.iter().all(|r| r.error.as_deref().is_some_and(|e| e.starts_with("all queries failed"))));
    }
}
