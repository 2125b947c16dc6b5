use netprobe_core::timing::round2;
use os_tools::stats::{loss_percent, mean};
use os_tools::ParsedHop;
use serde::{Deserialize, Serialize};

/// Address shown for a hop that never answered.
pub const NO_REPLY: &str = "*";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HopResult {
    pub hop: u32,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    pub rtt_ms: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_rtt_ms: Vec<f64>,
    pub loss_rate: f64,
    pub timed_out: bool,
}

impl HopResult {
    pub fn silent(hop: u32) -> Self {
        HopResult {
            hop,
            address: NO_REPLY.to_string(),
            hostname: None,
            rtt_ms: 0.0,
            all_rtt_ms: Vec::new(),
            loss_rate: 100.0,
            timed_out: true,
        }
    }

    pub fn from_parsed(p: &ParsedHop, probes: u32) -> Self {
        if p.samples.is_empty() {
            let mut hop = HopResult::silent(p.index);
            if let Some(addr) = &p.address {
                hop.address = addr.clone();
                hop.hostname = p.hostname.clone();
            }
            return hop;
        }
        let received = (p.samples.len() as u32).min(probes);
        HopResult {
            hop: p.index,
            address: p.address.clone().unwrap_or_else(|| NO_REPLY.to_string()),
            hostname: p.hostname.clone(),
            rtt_ms: mean(&p.samples).map(round2).unwrap_or(0.0),
            all_rtt_ms: p.samples.clone(),
            loss_rate: round2(loss_percent(probes, received)),
            timed_out: false,
        }
    }
}

/// Turn parsed lines into a hop list numbered 1..=n with no gaps. Repeated
/// indices keep the first line; missing ones become silent hops.
pub fn build_hops(parsed: &[ParsedHop], probes: u32) -> Vec<HopResult> {
    let mut hops: Vec<HopResult> = Vec::with_capacity(parsed.len());
    for p in parsed {
        let next = hops.len() as u32 + 1;
        if p.index < next {
            continue;
        }
        for missing in next..p.index {
            hops.push(HopResult::silent(missing));
        }
        hops.push(HopResult::from_parsed(p, probes));
    }
    hops
}

/// The last hop is the target, or at least it answered.
pub fn reached(hops: &[HopResult], target_ip: &str) -> bool {
    hops.last().is_some_and(|last| last.address == target_ip || !last.timed_out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(index: u32, addr: Option<&str>, samples: &[f64]) -> ParsedHop {
        ParsedHop {
            index,
            address: addr.map(String::from),
            hostname: None,
            samples: samples.to_vec(),
            timeouts: 3u32.saturating_sub(samples.len() as u32),
        }
    }

    #[test]
    fn gaps_are_filled_and_indices_contiguous() {
        let input = vec![parsed(1, Some("10.0.0.1"), &[1.0, 2.0, 3.0]), parsed(4, Some("8.8.8.8"), &[9.0])];
        let hops = build_hops(&input, 3);
        assert_eq!(hops.iter().map(|h| h.hop).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert!(hops[1].timed_out && hops[2].timed_out);
        assert_eq!(hops[1].loss_rate, 100.0);
        assert_eq!(hops[0].rtt_ms, 2.0);
        assert_eq!(hops[3].loss_rate, 66.67);
    }

    #[test]
    fn duplicate_indices_keep_first() {
        let input = vec![parsed(1, Some("10.0.0.1"), &[1.0]), parsed(1, Some("10.0.0.2"), &[1.0])];
        let hops = build_hops(&input, 3);
        assert_eq!(hops.len(), 1);
        assert_eq!(hops[0].address, "10.0.0.1");
    }

    #[test]
    fn silent_hop_shape() {
        let hops = build_hops(&[parsed(1, None, &[])], 3);
        assert_eq!(hops[0], HopResult::silent(1));
        assert_eq!(hops[0].address, NO_REPLY);
    }

    #[test]
    fn reached_heuristic() {
        let hops = build_hops(&[parsed(1, Some("127.0.0.1"), &[0.05, 0.04, 0.04])], 3);
        assert!(reached(&hops, "127.0.0.1"));
        let trailing_silence = build_hops(&[parsed(1, Some("10.0.0.1"), &[1.0]), parsed(2, None, &[])], 3);
        assert!(!reached(&trailing_silence, "8.8.8.8"));
        assert!(!reached(&[], "8.8.8.8"));
    }

    #[test]
    fn wire_names() {
        let v = serde_json::to_value(HopResult::silent(2)).unwrap();
        assert_eq!(v["hop"], 2);
        assert_eq!(v["timedOut"], true);
        assert_eq!(v["lossRate"], 100.0);
        assert!(v.get("allRttMs").is_none());
    }
}
