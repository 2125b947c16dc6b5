//! Latency statistics over ping/traceroute samples.

use netprobe_core::timing::round2;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencyStats {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}

impl LatencyStats {
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        let first = *samples.first()?;
        let (mut min, mut max, mut sum) = (first, first, 0.0);
        for &s in samples {
            min = min.min(s);
            max = max.max(s);
            sum += s;
        }
        Some(LatencyStats { min, avg: round2(sum / samples.len() as f64), max })
    }
}

pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Mean absolute difference between consecutive samples; 0 below two samples.
pub fn jitter(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let total: f64 = samples.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
    round2(total / (samples.len() - 1) as f64)
}

pub fn loss_percent(expected: u32, received: u32) -> f64 {
    if expected == 0 {
        return 0.0;
    }
    let lost = expected.saturating_sub(received);
    round2(f64::from(lost) / f64::from(expected) * 100.0)
}
