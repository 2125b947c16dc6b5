//! Single-target reachability checks: ICMP via the OS `ping`, TCP connect,
//! and a best-effort UDP write.

mod ping;
mod request;
mod result;
mod socket;

pub use ping::{ping_result, ping_summary, probe_ping, PingOutcome};
pub use request::{ProbeMode, ProbeRequest, DEFAULT_ALL_PORTS};
pub use result::{Evidence, ProbeOutcome, ProbeResult, Rtt};
pub use socket::{probe_tcp, probe_udp};

use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

/// Run the probe described by `req`. Never fails: every network outcome is
/// carried in the returned results.
pub async fn probe(req: &ProbeRequest) -> ProbeOutcome {
    debug!(target = %req.target(), mode = ?req.mode(), "probe");
    match req.mode() {
        ProbeMode::Ping => ProbeOutcome::Single(probe_ping(req.target().as_str(), req.ping_options(), req.timeout()).await),
        ProbeMode::Tcp => ProbeOutcome::Single(probe_tcp(req.target().as_str(), req.port(), req.timeout()).await),
        ProbeMode::Udp => ProbeOutcome::Single(probe_udp(req.target().as_str(), req.port(), req.timeout()).await),
        ProbeMode::All => ProbeOutcome::Many(probe_all(req).await),
    }
}

/// Ping plus one TCP probe per requested port, all in flight at once unless
/// the request carries a concurrency limit. Ping comes first in the output,
/// then ports in request order.
pub async fn probe_all(req: &ProbeRequest) -> Vec<ProbeResult> {
    let target = req.target().as_str().to_string();
    let timeout = req.timeout();
    let limit = req.concurrency().map(|n| Arc::new(Semaphore::new(n.max(1))));

    let ping_target = target.clone();
    let ping_opts = req.ping_options();
    let ping = tokio::spawn(async move { probe_ping(&ping_target, ping_opts, timeout).await });

    let mut handles = Vec::with_capacity(req.ports().len());
    for &port in req.ports() {
        let t = target.clone();
        let limit = limit.clone();
        handles.push((
            port,
            tokio::spawn(async move {
                let _permit = match limit {
                    Some(sem) => sem.acquire_owned().await.ok(),
                    None => None,
                };
                probe_tcp(&t, port, timeout).await
            }),
        ));
    }

    let mut results = Vec::with_capacity(handles.len() + 1);
    results.push(match ping.await {
        Ok(r) => r,
        Err(e) => ProbeResult::failure(&target, ProbeMode::Ping, None, Evidence::IcmpEcho, format!("ping task failed: {e}")),
    });
    for (port, h) in handles {
        results.push(match h.await {
            Ok(r) => r,
            Err(e) => {
                ProbeResult::failure(&target, ProbeMode::Tcp, Some(port), Evidence::TcpHandshake, format!("probe task failed: {e}"))
            }
        });
    }
    results
}
