//! Error taxonomy shared by every component.
//!
//! Only conditions that invalidate a whole request are errors. Unreachable
//! hosts, closed ports and timed-out hops are ordinary result data.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid argument: {0}")]
    Argument(String),
    #[error("invalid port token {token:?}: {reason}")]
    PortSpec { token: String, reason: String },
    #[error("invalid CIDR {input:?}: {reason}")]
    Cidr { input: String, reason: String },
    #[error("no valid ports specified")]
    EmptyPortList,
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not resolve {host}: {reason}")]
    Resolve { host: String, reason: String },
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl ProbeError {
    pub fn port_token(token: &str, reason: impl Into<String>) -> Self {
        ProbeError::PortSpec { token: token.to_string(), reason: reason.into() }
    }

    /// Argument-class errors end the process with a nonzero exit code.
    pub fn is_argument(&self) -> bool {
        matches!(
            self,
            ProbeError::Argument(_) | ProbeError::PortSpec { .. } | ProbeError::Cidr { .. } | ProbeError::EmptyPortList
        )
    }
}

pub type Result<T, E = ProbeError> = std::result::Result<T, E>;
