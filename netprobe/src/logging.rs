use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "NETPROBE_LOG";
pub const DEFAULT_LEVEL: &str = "warn";

/// Filter from `$NETPROBE_LOG`, then the config level, then `warn`.
pub fn env_filter(cfg: Option<&LoggingConfig>) -> EnvFilter {
    if let Ok(f) = EnvFilter::try_from_env(LOG_ENV) {
        return f;
    }
    let level = cfg.and_then(|c| c.level.as_deref()).unwrap_or(DEFAULT_LEVEL);
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
}

/// Install the stderr subscriber. Stdout carries only the JSON result.
pub fn init(cfg: Option<&LoggingConfig>) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(cfg))
        .with_writer(std::io::stderr)
        .with_target(false);
    let json = cfg.and_then(|c| c.format.as_deref()).is_some_and(|f| f.eq_ignore_ascii_case("json"));
    // A second init in the same process is a no-op.
    let _ = if json { builder.json().try_init() } else { builder.compact().try_init() };
}
