//! CIDR sweep: ping every address, reverse-resolve it, and port-scan the
//! ones that answer.

mod cidr;
mod host;
mod sink;

pub use cidr::{expand_cidr, MAX_HOSTS};
pub use host::{HostInfo, PingStats};
pub use sink::{format_ports, host_block, host_line, host_summary, progress_line, JsonSink, LiveSink, SweepSink};

use netprobe_core::timing::now_rfc3339;
use netprobe_core::Result;
use os_tools::PingOptions;
use port_scan::{parse_port_spec, scan, PortScanRequest};
use reachability::PingOutcome;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const DEFAULT_PORTS: [u16; 5] = [22, 80, 443, 3389, 8080];
pub const DEFAULT_WORKERS: usize = 20;

#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub ports: Vec<u16>,
    pub workers: usize,
    pub max_hosts: usize,
    pub ping: PingOptions,
    pub dns_timeout: Duration,
    pub port_timeout: Duration,
    pub port_concurrency: usize,
    pub progress_interval: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            ports: DEFAULT_PORTS.to_vec(),
            workers: DEFAULT_WORKERS,
            max_hosts: MAX_HOSTS,
            ping: PingOptions::default(),
            dns_timeout: Duration::from_secs(2),
            port_timeout: Duration::from_secs(2),
            port_concurrency: port_scan::DEFAULT_MAX_CONCURRENT,
            progress_interval: Duration::from_millis(500),
        }
    }
}

impl SweepConfig {
    pub fn with_port_spec(mut self, spec: &str) -> Result<Self> {
        self.ports = parse_port_spec(spec)?;
        Ok(self)
    }
}

/// Ping, then reverse DNS, then (only if the ping got a reply) the port scan.
pub async fn scan_host(ip: IpAddr, cfg: &SweepConfig) -> HostInfo {
    let outcome = reachability::ping_summary(&ip.to_string(), &cfg.ping, cfg.ping.deadline()).await;
    complete_host(ip, &outcome, cfg).await
}

/// Everything after the ping: reverse DNS for every host, ports only for
/// hosts that replied.
pub async fn complete_host(ip: IpAddr, outcome: &PingOutcome, cfg: &SweepConfig) -> HostInfo {
    let addr = ip.to_string();
    let ping_stats = PingStats::from(outcome);
    let is_reachable = ping_stats.packets_received > 0;

    let names = dns::reverse_lookup_all(ip, cfg.dns_timeout).await;
    let hostname = names.first().cloned();
    let dns_names = (!names.is_empty()).then_some(names);

    let mut open_ports = Vec::new();
    if is_reachable {
        match PortScanRequest::with_ports(&addr, cfg.ports.clone()) {
            Ok(req) => {
                let req = req
                    .timeout(cfg.port_timeout)
                    .max_concurrent(cfg.port_concurrency)
                    .banner_timeout(Duration::ZERO);
                open_ports = scan(&req).await.open_port_numbers();
            }
            Err(e) => warn!(%ip, error = %e, "port scan skipped"),
        }
    }
    debug!(%ip, is_reachable, open = open_ports.len(), "host scanned");

    HostInfo { ip_address: addr, hostname, is_reachable, ping_stats, open_ports, dns_names, scanned_at: now_rfc3339() }
}

/// Sweep every host in `cidr` with a fixed pool of workers. Malformed CIDR
/// syntax and a sink that cannot write the final output are errors; results
/// come back ordered by address.
pub async fn sweep(cidr: &str, cfg: &SweepConfig, sink: Arc<dyn SweepSink>) -> Result<Vec<HostInfo>> {
    let hosts = Arc::new(expand_cidr(cidr, cfg.max_hosts)?);
    let total = hosts.len();
    info!(cidr, total, workers = cfg.workers, "sweep start");
    sink.started(cidr, total);

    let cursor = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicUsize::new(0));
    let results = Arc::new(Mutex::new(Vec::with_capacity(total)));
    let cfg = Arc::new(cfg.clone());

    let progress = sink.wants_progress().then(|| {
        let (done, sink, every) = (done.clone(), sink.clone(), cfg.progress_interval);
        tokio::spawn(async move {
            loop {
                let n = done.load(Ordering::Relaxed);
                if n >= total {
                    break;
                }
                sink.progress(n, total);
                tokio::time::sleep(every).await;
            }
        })
    });

    let mut workers = Vec::new();
    for _ in 0..cfg.workers.max(1).min(total) {
        let (hosts, cursor, done, results, cfg, sink) =
            (hosts.clone(), cursor.clone(), done.clone(), results.clone(), cfg.clone(), sink.clone());
        workers.push(tokio::spawn(async move {
            loop {
                let i = cursor.fetch_add(1, Ordering::Relaxed);
                let Some(&ip) = hosts.get(i) else { break };
                let info = scan_host(ip, &cfg).await;
                sink.host_done(&info);
                results.lock().await.push(info);
                done.fetch_add(1, Ordering::Relaxed);
            }
        }));
    }
    for w in workers {
        if let Err(e) = w.await {
            warn!(error = %e, "sweep worker failed");
        }
    }
    if let Some(p) = progress {
        p.abort();
    }

    let mut all = std::mem::take(&mut *results.lock().await);
    all.sort_by_key(|h| h.ip_address.parse::<IpAddr>().ok());
    sink.finished(&all)?;
    info!(cidr, reachable = all.iter().filter(|h| h.is_reachable).count(), "sweep done");
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use os_tools::PingSummary;
    use std::sync::Mutex as StdMutex;
    use tokio::net::TcpListener;

    #[derive(Default)]
    struct Recorder {
        seen: StdMutex<Vec<String>>,
        finished: StdMutex<Vec<String>>,
    }

    impl SweepSink for Recorder {
        fn host_done(&self, info: &HostInfo) {
            self.seen.lock().unwrap().push(info.ip_address.clone());
        }
        fn finished(&self, results: &[HostInfo]) -> std::io::Result<()> {
            *self.finished.lock().unwrap() = results.iter().map(|h| h.ip_address.clone()).collect();
            Ok(())
        }
    }

    fn quick_config() -> SweepConfig {
        SweepConfig {
            ping: PingOptions { count: 1, interval: Duration::from_millis(250), timeout: Duration::from_secs(1), size: 56 },
            dns_timeout: Duration::from_millis(300),
            ..SweepConfig::default()
        }
    }

    #[test]
    fn defaults() {
        let cfg = SweepConfig::default();
        assert_eq!(cfg.ports, vec![22, 80, 443, 3389, 8080]);
        assert_eq!(cfg.workers, 20);
        assert_eq!(cfg.ping.count, 4);
        assert!(SweepConfig::default().with_port_spec("0").is_err());
        assert_eq!(SweepConfig::default().with_port_spec("443,80").unwrap().ports, vec![80, 443]);
    }

    #[tokio::test]
    async fn malformed_cidr_is_rejected_before_scanning() {
        let rec = Arc::new(Recorder::default());
        assert!(sweep("10.0.0.0/40", &quick_config(), rec.clone()).await.is_err());
        assert!(rec.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn documentation_block_is_unreachable() {
        let rec = Arc::new(Recorder::default());
        let hosts = sweep("203.0.113.0/31", &quick_config(), rec.clone()).await.unwrap();
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts[0].ip_address, "203.0.113.0");
        assert_eq!(hosts[1].ip_address, "203.0.113.1");
        for h in &hosts {
            assert!(!h.is_reachable);
            assert!(h.open_ports.is_empty());
        }
        assert_eq!(rec.seen.lock().unwrap().len(), 2);
        assert_eq!(*rec.finished.lock().unwrap(), vec!["203.0.113.0".to_string(), "203.0.113.1".to_string()]);
    }

    struct BrokenStdout;

    impl SweepSink for BrokenStdout {
        fn host_done(&self, _info: &HostInfo) {}
        fn finished(&self, _results: &[HostInfo]) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdout closed"))
        }
    }

    #[tokio::test]
    async fn failed_final_write_fails_the_sweep() {
        let err = sweep("203.0.113.7", &quick_config(), Arc::new(BrokenStdout)).await.unwrap_err();
        assert!(matches!(err, netprobe_core::ProbeError::Output(_)));
        assert!(!err.is_argument());
    }

    #[tokio::test]
    async fn replying_host_gets_port_scanned() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let closed = {
            let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
            l.local_addr().unwrap().port()
        };
        let outcome = PingOutcome {
            summary: PingSummary { sent: 1, received: 1, samples: vec![0.05], ..PingSummary::default() },
            error: None,
            elapsed_ms: 1,
        };
        let cfg = SweepConfig { ports: vec![port, closed], port_timeout: Duration::from_secs(1), ..quick_config() };

        let info = complete_host("127.0.0.1".parse().unwrap(), &outcome, &cfg).await;
        assert!(info.is_reachable);
        assert_eq!(info.open_ports, vec![port]);
        assert_eq!(info.ping_stats.packets_received, 1);
    }

    #[tokio::test]
    async fn silent_host_skips_the_port_scan() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let outcome = PingOutcome {
            summary: PingSummary { sent: 1, received: 0, loss_percent: 100.0, ..PingSummary::default() },
            error: Some("Ping failed: exit status: 1".into()),
            elapsed_ms: 1000,
        };
        let cfg = SweepConfig { ports: vec![port], ..quick_config() };

        let info = complete_host("127.0.0.1".parse().unwrap(), &outcome, &cfg).await;
        assert!(!info.is_reachable);
        assert!(info.open_ports.is_empty());
    }
}
