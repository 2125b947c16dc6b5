//! Shared plumbing for the netprobe executables: configuration, logging,
//! argument helpers and JSON output.

pub mod args;
pub mod config;
pub mod logging;
pub mod output;

use anyhow::{Context, Result};
pub use config::Config;

/// Load the config file, then start logging from it. Config problems are
/// reported through the logger once it exists and otherwise ignored.
pub fn bootstrap() -> Config {
    let loaded = config::load_config(config::config_path().as_deref());
    let cfg = match &loaded {
        Ok(c) => c.clone().unwrap_or_default(),
        Err(_) => Config::default(),
    };
    logging::init(cfg.logging.as_ref());
    if let Err(e) = loaded {
        tracing::warn!(error = %format!("{e:#}"), "ignoring config file");
    }
    tracing::debug!(version = netprobe_core::version(), "netprobe starting");
    cfg
}

/// One multi-thread runtime per process.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread().enable_all().build().context("starting async runtime")
}
