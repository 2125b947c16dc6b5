//! Wrappers around the OS `ping` and `traceroute` utilities: command
//! construction per platform, deadline-bounded execution, and parsers for
//! their text output.

pub mod ping;
pub mod platform;
pub mod stats;
pub mod subprocess;
pub mod trace;

pub use ping::{ping_command, ping_parser, PingOptions, PingParser, PingSummary};
pub use platform::Os;
pub use stats::LatencyStats;
pub use subprocess::{run_tool, ToolOutput};
pub use trace::{trace_parser, traceroute_command, ParsedHop, TraceParser};
