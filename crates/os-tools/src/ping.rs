//! `ping` command lines and output parsers.
//!
//! Parsers are chosen per platform through [`ping_parser`]; the prober and
//! the sweep never look at ping text themselves.

use crate::platform::Os;
use crate::stats::{jitter, loss_percent, LatencyStats};
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingOptions {
    pub count: u32,
    pub interval: Duration,
    /// Per-reply wait.
    pub timeout: Duration,
    pub size: u32,
}

impl Default for PingOptions {
    fn default() -> Self {
        PingOptions { count: 4, interval: Duration::from_millis(250), timeout: Duration::from_secs(2), size: 56 }
    }
}

impl PingOptions {
    /// An outer bound for the whole subprocess: every interval, the last
    /// reply wait, and one second of slack for process start-up.
    pub fn deadline(&self) -> Duration {
        self.interval * self.count.saturating_sub(1) + self.timeout + Duration::from_secs(1)
    }
}

/// Program and arguments for `ping` on `os`.
pub fn ping_command(os: Os, opts: &PingOptions, target: &str) -> (&'static str, Vec<String>) {
    let wait_secs = opts.timeout.as_secs().max(1);
    let wait_ms = opts.timeout.as_millis().max(1);
    let interval = format!("{:.2}", opts.interval.as_secs_f64().max(0.2));
    let mut args: Vec<String> = match os {
        Os::Windows => vec![
            "-n".into(),
            opts.count.to_string(),
            "-w".into(),
            wait_ms.to_string(),
            "-l".into(),
            opts.size.to_string(),
        ],
        Os::MacOs => vec![
            "-c".into(),
            opts.count.to_string(),
            "-W".into(),
            wait_ms.to_string(),
            "-i".into(),
            interval,
            "-s".into(),
            opts.size.to_string(),
        ],
        Os::Linux | Os::Other => vec![
            "-c".into(),
            opts.count.to_string(),
            "-W".into(),
            wait_secs.to_string(),
            "-i".into(),
            interval,
            "-s".into(),
            opts.size.to_string(),
        ],
    };
    args.push(target.to_string());
    ("ping", args)
}

/// What could be recovered from one ping transcript.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PingSummary {
    pub sent: u32,
    pub received: u32,
    pub loss_percent: f64,
    pub rtt: Option<LatencyStats>,
    pub jitter_ms: f64,
    /// Per-reply round-trip times in output order.
    pub samples: Vec<f64>,
    /// False when the numbers were derived from samples alone.
    pub summary_parsed: bool,
}

pub trait PingParser: Send + Sync {
    /// `expected` is the requested packet count, used when the transcript
    /// has no summary line.
    fn parse(&self, output: &str, expected: u32) -> PingSummary;
}

/// iputils / BSD ping as found on Linux and macOS.
#[derive(Debug, Default)]
pub struct UnixPingParser;

/// Windows `ping.exe` (English output).
#[derive(Debug, Default)]
pub struct WindowsPingParser;

pub fn ping_parser(os: Os) -> &'static dyn PingParser {
    static UNIX: UnixPingParser = UnixPingParser;
    static WINDOWS: WindowsPingParser = WindowsPingParser;
    match os {
        Os::Windows => &WINDOWS,
        _ => &UNIX,
    }
}

fn re(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static ping pattern"))
}

fn samples(re: &Regex, output: &str) -> Vec<f64> {
    re.captures_iter(output).filter_map(|c| c[1].parse::<f64>().ok()).collect()
}

impl PingParser for UnixPingParser {
    fn parse(&self, output: &str, expected: u32) -> PingSummary {
        static SUMMARY: OnceLock<Regex> = OnceLock::new();
        static RTT: OnceLock<Regex> = OnceLock::new();
        static SAMPLE: OnceLock<Regex> = OnceLock::new();
        let summary = re(&SUMMARY, r"(\d+) packets transmitted, (\d+) (?:packets )?received,(?: \+\d+ \w+,)* ([\d.]+)% packet loss")
            .captures(output)
            .and_then(|c| Some((c[1].parse().ok()?, c[2].parse().ok()?, c[3].parse().ok()?)));
        let reported = re(&RTT, r"(?:rtt|round-trip) min/avg/max/(?:mdev|stddev) = ([\d.]+)/([\d.]+)/([\d.]+)/([\d.]+) ms")
            .captures(output)
            .and_then(|c| {
                let stats = LatencyStats { min: c[1].parse().ok()?, avg: c[2].parse().ok()?, max: c[3].parse().ok()? };
                Some((stats, c[4].parse::<f64>().ok()))
            });
        let samples = samples(re(&SAMPLE, r"time[=<]([\d.]+) ?ms"), output);
        assemble(expected, summary, reported, samples)
    }
}

impl PingParser for WindowsPingParser {
    fn parse(&self, output: &str, expected: u32) -> PingSummary {
        static SUMMARY: OnceLock<Regex> = OnceLock::new();
        static RTT: OnceLock<Regex> = OnceLock::new();
        static SAMPLE: OnceLock<Regex> = OnceLock::new();
        let summary = re(&SUMMARY, r"Sent = (\d+), Received = (\d+), Lost = \d+ \((\d+)% loss\)")
            .captures(output)
            .and_then(|c| Some((c[1].parse().ok()?, c[2].parse().ok()?, c[3].parse().ok()?)));
        let reported = re(&RTT, r"Minimum = (\d+)ms, Maximum = (\d+)ms, Average = (\d+)ms")
            .captures(output)
            .and_then(|c| {
                let stats = LatencyStats { min: c[1].parse().ok()?, max: c[2].parse().ok()?, avg: c[3].parse().ok()? };
                Some((stats, None))
            });
        let samples = samples(re(&SAMPLE, r"time[=<](\d+)ms"), output);
        assemble(expected, summary, reported, samples)
    }
}

fn assemble(
    expected: u32,
    summary: Option<(u32, u32, f64)>,
    reported: Option<(LatencyStats, Option<f64>)>,
    samples: Vec<f64>,
) -> PingSummary {
    let mut out = PingSummary { sent: expected, ..PingSummary::default() };
    match summary {
        Some((sent, received, loss)) => {
            out.sent = sent;
            out.received = received;
            out.loss_percent = loss;
            out.summary_parsed = true;
        }
        None if !samples.is_empty() => {
            out.received = u32::try_from(samples.len()).unwrap_or(u32::MAX);
            out.sent = out.sent.max(out.received);
            out.loss_percent = loss_percent(out.sent, out.received);
        }
        None => out.loss_percent = if expected > 0 { 100.0 } else { 0.0 },
    }
    let deviation = reported.and_then(|(_, d)| d);
    out.rtt = reported.map(|(s, _)| s).or_else(|| LatencyStats::from_samples(&samples));
    out.jitter_ms = if samples.len() >= 2 { jitter(&samples) } else { deviation.unwrap_or(0.0) };
    out.samples = samples;
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINUX_OK: &str = "PING 127.0.0.1 (127.0.0.1) 56(84) bytes of data.
64 bytes from 127.0.0.1: icmp_seq=1 ttl=64 time=0.040 ms
64 bytes from 127.0.0.1: icmp_seq=2 ttl=64 time=0.080 ms
64 bytes from 127.0.0.1: icmp_seq=3 ttl=64 time=0.060 ms

--- 127.0.0.1 ping statistics ---
3 packets transmitted, 3 received, 0% packet loss, time 2041ms
rtt min/avg/max/mdev = 0.040/0.060/0.080/0.016 ms
";

    const LINUX_DEAD: &str = "PING 203.0.113.1 (203.0.113.1) 56(84) bytes of data.
From 192.168.1.1 icmp_seq=1 Destination Host Unreachable

--- 203.0.113.1 ping statistics ---
4 packets transmitted, 0 received, +1 errors, 100% packet loss, time 3062ms
";

    const MACOS_OK: &str = "PING 10.0.0.1 (10.0.0.1): 56 data bytes
64 bytes from 10.0.0.1: icmp_seq=0 ttl=64 time=1.500 ms
64 bytes from 10.0.0.1: icmp_seq=1 ttl=64 time=2.500 ms

--- 10.0.0.1 ping statistics ---
2 packets transmitted, 2 packets received, 0.0% packet loss
round-trip min/avg/max/stddev = 1.500/2.000/2.500/0.500 ms
";

    const WINDOWS_OK: &str = "Pinging 10.0.0.1 with 32 bytes of data:
Reply from 10.0.0.1: bytes=32 time=3ms TTL=64
Reply from 10.0.0.1: bytes=32 time<1ms TTL=64
Request timed out.

Ping statistics for 10.0.0.1:
    Packets: Sent = 3, Received = 2, Lost = 1 (33% loss),
Approximate round trip times in milli-seconds:
    Minimum = 1ms, Maximum = 3ms, Average = 2ms
";

    #[test]
    fn linux_summary_and_jitter_from_samples() {
        let s = UnixPingParser.parse(LINUX_OK, 3);
        assert!(s.summary_parsed);
        assert_eq!((s.sent, s.received, s.loss_percent), (3, 3, 0.0));
        assert_eq!(s.rtt, Some(LatencyStats { min: 0.04, avg: 0.06, max: 0.08 }));
        assert_eq!(s.samples, vec![0.04, 0.08, 0.06]);
        // |0.08-0.04| + |0.06-0.08| = 0.06 over two gaps
        assert_eq!(s.jitter_ms, 0.03);
    }

    #[test]
    fn linux_total_loss_with_errors_field() {
        let s = UnixPingParser.parse(LINUX_DEAD, 4);
        assert!(s.summary_parsed);
        assert_eq!((s.sent, s.received, s.loss_percent), (4, 0, 100.0));
        assert!(s.rtt.is_none());
        assert_eq!(s.jitter_ms, 0.0);
    }

    #[test]
    fn macos_round_trip_line() {
        let s = ping_parser(Os::MacOs).parse(MACOS_OK, 2);
        assert_eq!((s.sent, s.received), (2, 2));
        assert_eq!(s.rtt.map(|r| r.avg), Some(2.0));
        assert_eq!(s.jitter_ms, 1.0);
    }

    #[test]
    fn falls_back_to_samples_without_summary() {
        let truncated = "64 bytes from 10.0.0.1: icmp_seq=1 ttl=64 time=10.0 ms
64 bytes from 10.0.0.1: icmp_seq=2 ttl=64 time=14.0 ms
";
        let s = UnixPingParser.parse(truncated, 4);
        assert!(!s.summary_parsed);
        assert_eq!((s.sent, s.received, s.loss_percent), (4, 2, 50.0));
        assert_eq!(s.rtt, Some(LatencyStats { min: 10.0, avg: 12.0, max: 14.0 }));
        assert_eq!(s.jitter_ms, 4.0);
    }

    #[test]
    fn empty_output_is_total_loss() {
        let s = UnixPingParser.parse("", 3);
        assert_eq!((s.sent, s.received, s.loss_percent), (3, 0, 100.0));
        assert!(s.rtt.is_none());
    }

    #[test]
    fn single_sample_uses_reported_deviation() {
        let out = "64 bytes from 1.1.1.1: icmp_seq=1 ttl=57 time=9.1 ms
1 packets transmitted, 1 received, 0% packet loss, time 0ms
rtt min/avg/max/mdev = 9.100/9.100/9.100/0.000 ms
";
        let s = UnixPingParser.parse(out, 1);
        assert_eq!(s.received, 1);
        assert_eq!(s.jitter_ms, 0.0);
    }

    #[test]
    fn windows_summary_and_sub_millisecond_samples() {
        let s = ping_parser(Os::Windows).parse(WINDOWS_OK, 3);
        assert!(s.summary_parsed);
        assert_eq!((s.sent, s.received, s.loss_percent), (3, 2, 33.0));
        assert_eq!(s.rtt, Some(LatencyStats { min: 1.0, avg: 2.0, max: 3.0 }));
        assert_eq!(s.samples, vec![3.0, 1.0]);
        assert_eq!(s.jitter_ms, 2.0);
    }

    #[test]
    fn commands_per_platform() {
        let opts = PingOptions { count: 3, interval: Duration::from_secs(1), timeout: Duration::from_secs(2), size: 56 };
        let (prog, args) = ping_command(Os::Linux, &opts, "10.0.0.1");
        assert_eq!(prog, "ping");
        assert_eq!(args, ["-c", "3", "-W", "2", "-i", "1.00", "-s", "56", "10.0.0.1"]);
        let (_, args) = ping_command(Os::MacOs, &opts, "10.0.0.1");
        assert_eq!(&args[2..4], ["-W", "2000"]);
        let (_, args) = ping_command(Os::Windows, &opts, "10.0.0.1");
        assert_eq!(args, ["-n", "3", "-w", "2000", "-l", "56", "10.0.0.1"]);
    }

    #[test]
    fn deadline_covers_all_packets() {
        let opts = PingOptions::default();
        assert_eq!(opts.deadline(), Duration::from_millis(250 * 3 + 2000 + 1000));
    }
}
