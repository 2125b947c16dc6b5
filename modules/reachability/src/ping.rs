use crate::request::ProbeMode;
use crate::result::{Evidence, ProbeResult};
use os_tools::{ping_command, ping_parser, run_tool, Os, PingOptions, PingSummary};
use std::time::Duration;
use tracing::{debug, warn};

/// A parsed ping run plus the reason it went wrong, if it did.
#[derive(Debug, Clone, Default)]
pub struct PingOutcome {
    pub summary: PingSummary,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

/// Run the OS ping under `deadline` and parse whatever it printed. A
/// nonzero exit or a kill at the deadline still goes through the parser,
/// since total loss is an answer, not a crash.
pub async fn ping_summary(target: &str, opts: &PingOptions, deadline: Duration) -> PingOutcome {
    let os = Os::current();
    let (program, args) = ping_command(os, opts, target);
    match run_tool(program, &args, deadline).await {
        Ok(out) => {
            let summary = ping_parser(os).parse(&out.combined(), opts.count);
            let error = if out.success() {
                None
            } else {
                Some(format!("Ping failed: {}", out.describe_exit()))
            };
            debug!(target, received = summary.received, sent = summary.sent, timed_out = out.timed_out, "ping parsed");
            PingOutcome { summary, error, elapsed_ms: out.elapsed_ms }
        }
        Err(e) => {
            warn!(target, error = %e, "ping unavailable");
            let summary = ping_parser(os).parse("", opts.count);
            PingOutcome { summary, error: Some(e.to_string()), elapsed_ms: 0 }
        }
    }
}

pub async fn probe_ping(target: &str, opts: PingOptions, deadline: Duration) -> ProbeResult {
    let outcome = ping_summary(target, &opts, deadline).await;
    ping_result(target, &outcome)
}

/// Turn a finished ping run into its reachability result.
pub fn ping_result(target: &str, outcome: &PingOutcome) -> ProbeResult {
    let s = &outcome.summary;
    let mut result = ProbeResult::new(target, ProbeMode::Ping, None, Evidence::IcmpEcho);
    result.success = s.received > 0;
    result.response_time_ms = if result.success { outcome.elapsed_ms } else { 0 };
    result.packet_loss = Some(s.loss_percent);
    result.rtt = s.rtt.map(Into::into);
    result.jitter_ms = result.success.then_some(s.jitter_ms);
    result.message = match (&outcome.error, result.success) {
        (_, true) => format!(
            "Successfully reached {} in {}ms ({}/{} replies)",
            target, outcome.elapsed_ms, s.received, s.sent
        ),
        (Some(e), false) => format!("Could not reach {}: {}", target, e),
        (None, false) => format!("Could not reach {}", target),
    };
    result
}
