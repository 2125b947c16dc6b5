//! TCP connect scan with per-port timeouts, bounded concurrency and
//! best-effort banner capture.

mod banner;
mod services;
mod spec;

pub use banner::{clean_banner, read_banner, BANNER_MAX_CHARS};
pub use services::service_name;
pub use spec::{parse_port_spec, MAX_PORT};

use netprobe_core::limits::descriptor_budget;
use netprobe_core::resolve::resolve_ip;
use netprobe_core::timing::{elapsed_ms, elapsed_ms_f64};
use netprobe_core::{ProbeError, Result, Target};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_MAX_CONCURRENT: usize = 100;
pub const DEFAULT_BANNER_TIMEOUT: Duration = Duration::from_millis(500);
pub const CHUNK_SIZE: usize = 1000;
/// Scans larger than this many ports get [`LARGE_SCAN_CONCURRENCY`] at most.
pub const LARGE_SCAN_THRESHOLD: usize = 10_000;
pub const LARGE_SCAN_CONCURRENCY: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortResult {
    pub port: u16,
    pub open: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    pub latency_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub target_ip: String,
    pub open_ports: Vec<PortResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub closed_ports: Vec<PortResult>,
    pub scan_time_ms: u64,
    pub ports_scanned: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScanSummary {
    pub fn open_port_numbers(&self) -> Vec<u16> {
        self.open_ports.iter().map(|p| p.port).collect()
    }
}

#[derive(Debug, Clone)]
pub struct PortScanRequest {
    pub target: Target,
    pub ports: Vec<u16>,
    pub timeout: Duration,
    pub max_concurrent: usize,
    /// Zero disables banner reads.
    pub banner_timeout: Duration,
    pub chunk_size: usize,
}

impl PortScanRequest {
    /// Parse `spec` and build a request with default limits.
    pub fn new(target: &str, spec: &str) -> Result<Self> {
        Self::with_ports(target, parse_port_spec(spec)?)
    }

    pub fn with_ports(target: &str, ports: Vec<u16>) -> Result<Self> {
        if ports.is_empty() {
            return Err(ProbeError::EmptyPortList);
        }
        Ok(PortScanRequest {
            target: Target::from(target),
            ports,
            timeout: DEFAULT_TIMEOUT,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            banner_timeout: DEFAULT_BANNER_TIMEOUT,
            chunk_size: CHUNK_SIZE,
        })
    }

    pub fn timeout(mut self, t: Duration) -> Self {
        self.timeout = t;
        self
    }

    pub fn max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n.max(1);
        self
    }

    pub fn banner_timeout(mut self, t: Duration) -> Self {
        self.banner_timeout = t;
        self
    }

    pub fn chunk_size(mut self, n: usize) -> Self {
        self.chunk_size = n.max(1);
        self
    }
}

/// Concurrency actually used: the request's ceiling, lowered for very large
/// scans and to the open-descriptor budget where one is known.
pub fn effective_concurrency(port_count: usize, requested: usize, fd_budget: Option<usize>) -> usize {
    let mut n = requested.max(1);
    if port_count > LARGE_SCAN_THRESHOLD {
        n = n.min(LARGE_SCAN_CONCURRENCY);
    }
    if let Some(budget) = fd_budget {
        n = n.min(budget.max(1));
    }
    n.min(port_count.max(1))
}

/// Scan every port in the request. Closed and filtered ports are data; this
/// never fails once the request exists.
pub async fn scan(req: &PortScanRequest) -> ScanSummary {
    let started = Instant::now();
    let concurrency = effective_concurrency(req.ports.len(), req.max_concurrent, descriptor_budget());
    debug!(target = %req.target, ports = req.ports.len(), concurrency, "port scan");

    let ip = match resolve_ip(req.target.as_str(), req.timeout).await {
        Ok(ip) => ip,
        Err(e) => {
            warn!(target = %req.target, error = %e, "target did not resolve");
            let closed = req
                .ports
                .iter()
                .map(|&port| PortResult { port, open: false, service: None, banner: None, latency_ms: 0.0 })
                .collect();
            return summarize(req, closed, elapsed_ms(started), Some(e.to_string()));
        }
    };

    let sem = Arc::new(Semaphore::new(concurrency));
    let results = Arc::new(Mutex::new(Vec::with_capacity(req.ports.len())));
    // Chunks run one after another; ports within a chunk race freely.
    for chunk in req.ports.chunks(req.chunk_size.max(1)) {
        let mut set = JoinSet::new();
        for &port in chunk {
            let sem = sem.clone();
            let results = results.clone();
            let (t, bt) = (req.timeout, req.banner_timeout);
            set.spawn(async move {
                let Ok(_permit) = sem.acquire_owned().await else { return };
                let r = scan_port(ip, port, t, bt).await;
                results.lock().await.push(r);
            });
        }
        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "port task failed");
            }
        }
    }

    let all = std::mem::take(&mut *results.lock().await);
    let summary = summarize(req, all, elapsed_ms(started), None);
    info!(target = %req.target, open = summary.open_ports.len(), scanned = summary.ports_scanned, ms = summary.scan_time_ms, "port scan done");
    summary
}

/// Connect once; on success label the service and try for a banner.
pub async fn scan_port(ip: IpAddr, port: u16, connect_timeout: Duration, banner_timeout: Duration) -> PortResult {
    let started = Instant::now();
    match timeout(connect_timeout, TcpStream::connect(SocketAddr::new(ip, port))).await {
        Ok(Ok(mut stream)) => {
            let latency_ms = elapsed_ms_f64(started);
            let banner = if banner_timeout.is_zero() { None } else { read_banner(&mut stream, banner_timeout).await };
            PortResult { port, open: true, service: service_name(port).map(String::from), banner, latency_ms }
        }
        _ => PortResult { port, open: false, service: None, banner: None, latency_ms: elapsed_ms_f64(started) },
    }
}

fn summarize(req: &PortScanRequest, all: Vec<PortResult>, scan_time_ms: u64, error: Option<String>) -> ScanSummary {
    let (mut open_ports, mut closed_ports): (Vec<_>, Vec<_>) = all.into_iter().partition(|r| r.open);
    open_ports.sort_unstable_by_key(|r| r.port);
    closed_ports.sort_unstable_by_key(|r| r.port);
    ScanSummary {
        target_ip: req.target.to_string(),
        open_ports,
        closed_ports,
        scan_time_ms,
        ports_scanned: req.ports.len(),
        error,
    }
}
