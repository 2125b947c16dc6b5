use crate::request::ProbeMode;
use os_tools::LatencyStats;
use serde::{Deserialize, Serialize};

/// What kind of observation a result rests on. `LocalWrite` only means the
/// local stack accepted a datagram and says nothing about the remote end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Evidence {
    IcmpEcho,
    TcpHandshake,
    LocalWrite,
}

impl Evidence {
    pub fn is_best_effort(self) -> bool {
        matches!(self, Evidence::LocalWrite)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rtt {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}

impl From<LatencyStats> for Rtt {
    fn from(s: LatencyStats) -> Self {
        Rtt { min: s.min, avg: s.avg, max: s.max }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    pub success: bool,
    pub message: String,
    pub target_ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub mode: ProbeMode,
    pub response_time_ms: u64,
    pub evidence: Evidence,
    pub best_effort: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet_loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtt: Option<Rtt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jitter_ms: Option<f64>,
}

impl ProbeResult {
    pub(crate) fn new(target: &str, mode: ProbeMode, port: Option<u16>, evidence: Evidence) -> Self {
        ProbeResult {
            success: false,
            message: String::new(),
            target_ip: target.to_string(),
            port,
            mode,
            response_time_ms: 0,
            evidence,
            best_effort: evidence.is_best_effort(),
            packet_loss: None,
            rtt: None,
            jitter_ms: None,
        }
    }

    pub(crate) fn failure(target: &str, mode: ProbeMode, port: Option<u16>, evidence: Evidence, message: String) -> Self {
        ProbeResult { message, ..ProbeResult::new(target, mode, port, evidence) }
    }
}

/// One result for ping/tcp/udp, a list for `all`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProbeOutcome {
    Single(ProbeResult),
    Many(Vec<ProbeResult>),
}
