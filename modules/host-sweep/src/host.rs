use netprobe_core::timing::now_rfc3339;
use reachability::PingOutcome;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PingStats {
    pub packets_sent: u32,
    pub packets_received: u32,
    pub packet_loss: f64,
    pub min_latency_ms: f64,
    pub avg_latency_ms: f64,
    pub max_latency_ms: f64,
    pub jitter_ms: f64,
    pub last_ping_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<&PingOutcome> for PingStats {
    fn from(outcome: &PingOutcome) -> Self {
        let s = &outcome.summary;
        let rtt = s.rtt.unwrap_or_default();
        PingStats {
            packets_sent: s.sent,
            packets_received: s.received,
            packet_loss: s.loss_percent,
            min_latency_ms: rtt.min,
            avg_latency_ms: rtt.avg,
            max_latency_ms: rtt.max,
            jitter_ms: s.jitter_ms,
            last_ping_time: now_rfc3339(),
            error_message: outcome.error.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostInfo {
    pub ip_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    pub is_reachable: bool,
    pub ping_stats: PingStats,
    /// Empty unless the host answered ping.
    #[serde(default)]
    pub open_ports: Vec<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_names: Option<Vec<String>>,
    pub scanned_at: String,
}
