//! Core utilities and shared types for the probing engine.

pub mod error;
pub mod limits;
pub mod resolve;
pub mod timing;

pub use error::{ProbeError, Result};

pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// A probe target as the caller spelled it: an IP literal or a hostname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target(pub String);

impl Target {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the target is already an IP literal and needs no lookup.
    pub fn is_ip_literal(&self) -> bool {
        self.0.parse::<std::net::IpAddr>().is_ok()
    }
}

impl From<&str> for Target {
    fn from(s: &str) -> Self {
        Target(s.trim().to_string())
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!version().is_empty());
    }

    #[test]
    fn target_trims_and_detects_literals() {
        let t: Target = " 10.0.0.1 ".into();
        assert_eq!(t.as_str(), "10.0.0.1");
        assert!(t.is_ip_literal());
        assert!(!Target::from("example.com").is_ip_literal());
    }
}
