//! Traceroute through the OS tool, parsed into contiguous hop lists.

mod hops;

pub use hops::{build_hops, reached, HopResult, NO_REPLY};

use netprobe_core::resolve::resolve_ip;
use netprobe_core::timing::elapsed_ms;
use os_tools::{run_tool, trace_parser, traceroute_command, Os};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_HOPS: u32 = 30;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const PROBES_PER_HOP: u32 = 3;
/// Added to the per-target deadline for the whole multi-target run.
pub const MULTI_GRACE: Duration = Duration::from_secs(5);
const RESOLVE_DEADLINE: Duration = Duration::from_secs(5);
const PTR_DEADLINE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracerouteResult {
    pub target_ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_name: Option<String>,
    pub hops: Vec<HopResult>,
    pub success: bool,
    pub total_hops: usize,
    pub elapsed_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TracerouteResult {
    fn failed(target_ip: &str, target_name: Option<String>, error: impl Into<String>, elapsed_time_ms: u64) -> Self {
        TracerouteResult {
            target_ip: target_ip.to_string(),
            target_name,
            hops: Vec::new(),
            success: false,
            total_hops: 0,
            elapsed_time_ms,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiTracerouteResult {
    pub results: Vec<TracerouteResult>,
    pub total_time_ms: u64,
    pub successful: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct TraceRequest {
    pub targets: Vec<String>,
    pub max_hops: u32,
    /// Per-target deadline for the subprocess.
    pub timeout: Duration,
    pub numeric: bool,
}

impl TraceRequest {
    pub fn new(targets: Vec<String>) -> Self {
        TraceRequest { targets, max_hops: DEFAULT_MAX_HOPS, timeout: DEFAULT_TIMEOUT, numeric: false }
    }

    pub fn max_hops(mut self, n: u32) -> Self {
        self.max_hops = n.max(1);
        self
    }

    pub fn timeout(mut self, t: Duration) -> Self {
        self.timeout = t;
        self
    }

    pub fn numeric(mut self, on: bool) -> Self {
        self.numeric = on;
        self
    }
}

/// A target after the resolution pass: what to trace and what to call it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTarget {
    pub ip: String,
    pub name: Option<String>,
}

/// Resolve every hostname concurrently. A name that fails to resolve is
/// handed to the tool unchanged.
pub async fn resolve_targets(targets: &[String]) -> Vec<ResolvedTarget> {
    let mut set = JoinSet::new();
    for (idx, t) in targets.iter().enumerate() {
        let t = t.trim().to_string();
        set.spawn(async move {
            if t.parse::<IpAddr>().is_ok() {
                return (idx, ResolvedTarget { ip: t, name: None });
            }
            match resolve_ip(&t, RESOLVE_DEADLINE).await {
                Ok(ip) => (idx, ResolvedTarget { ip: ip.to_string(), name: Some(t) }),
                Err(e) => {
                    debug!(target = %t, error = %e, "pre-resolve failed");
                    (idx, ResolvedTarget { ip: t.clone(), name: Some(t) })
                }
            }
        });
    }
    let mut out: Vec<ResolvedTarget> =
        targets.iter().map(|t| ResolvedTarget { ip: t.trim().to_string(), name: None }).collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, r)) => out[idx] = r,
            Err(e) => warn!(error = %e, "resolve task failed"),
        }
    }
    out
}

/// The name reported for a target: the one it was given, else its PTR
/// record unless `numeric`. The lookup never outlives `deadline`.
async fn target_name(target: &ResolvedTarget, numeric: bool, deadline: Duration) -> Option<String> {
    match (&target.name, numeric, target.ip.parse::<IpAddr>()) {
        (Some(n), _, _) => Some(n.clone()),
        (None, false, Ok(ip)) => dns::reverse_lookup(ip, PTR_DEADLINE.min(deadline)).await,
        _ => None,
    }
}

/// Trace one resolved target under `deadline`. The reverse lookup runs
/// alongside the tool.
pub async fn trace(target: &ResolvedTarget, max_hops: u32, deadline: Duration, numeric: bool) -> TracerouteResult {
    let started = Instant::now();
    let os = Os::current();
    let (program, args) = traceroute_command(os, max_hops, PROBES_PER_HOP, numeric, &target.ip);

    let (name, ran) = tokio::join!(target_name(target, numeric, deadline), run_tool(program, &args, deadline));
    let out = match ran {
        Ok(out) => out,
        Err(e) => {
            warn!(target = %target.ip, error = %e, "traceroute unavailable");
            return TracerouteResult::failed(&target.ip, name, e.to_string(), elapsed_ms(started));
        }
    };

    let hops = build_hops(&trace_parser(os).parse(&out.stdout), PROBES_PER_HOP);
    let error = if hops.is_empty() {
        Some(if out.success() {
            "no hops in traceroute output".to_string()
        } else {
            format!("Traceroute error: {}", out.describe_exit())
        })
    } else {
        None
    };
    if !out.success() {
        debug!(target = %target.ip, exit = %out.describe_exit(), hops = hops.len(), "traceroute exited abnormally");
    }

    TracerouteResult {
        target_ip: target.ip.clone(),
        target_name: name,
        success: reached(&hops, &target.ip),
        total_hops: hops.len(),
        hops,
        elapsed_time_ms: elapsed_ms(started),
        error,
    }
}

/// Resolve then trace every target concurrently. Targets not finished by
/// the top-level deadline report `deadline exceeded`.
pub async fn trace_many(req: &TraceRequest) -> MultiTracerouteResult {
    let started = Instant::now();
    let targets = resolve_targets(&req.targets).await;
    let mut results: Vec<TracerouteResult> =
        targets.iter().map(|t| TracerouteResult::failed(&t.ip, t.name.clone(), "deadline exceeded", 0)).collect();

    let mut set = JoinSet::new();
    for (idx, t) in targets.into_iter().enumerate() {
        let (max_hops, deadline, numeric) = (req.max_hops, req.timeout, req.numeric);
        set.spawn(async move { (idx, trace(&t, max_hops, deadline, numeric).await) });
    }
    let drain = async {
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, r)) => results[idx] = r,
                Err(e) => warn!(error = %e, "trace task failed"),
            }
        }
    };
    let finished = timeout(req.timeout + MULTI_GRACE, drain).await.is_ok();
    if !finished {
        warn!(pending = set.len(), "traceroutes exceeded top-level deadline");
        set.abort_all();
    }

    let total_time_ms = elapsed_ms(started);
    for r in results.iter_mut().filter(|r| r.error.as_deref() == Some("deadline exceeded")) {
        r.elapsed_time_ms = total_time_ms;
    }
    let successful = results.iter().filter(|r| r.success).count();
    let failed = results.len() - successful;
    info!(targets = results.len(), successful, ms = total_time_ms, "traceroutes done");
    MultiTracerouteResult { results, total_time_ms, successful, failed }
}

/// Single-target convenience: resolve, then trace.
pub async fn trace_one(target: &str, max_hops: u32, deadline: Duration, numeric: bool) -> TracerouteResult {
    let resolved = resolve_targets(&[target.to_string()]).await;
    match resolved.first() {
        Some(t) => trace(t, max_hops, deadline, numeric).await,
        None => TracerouteResult::failed(target, None, "no target", 0),
    }
}
