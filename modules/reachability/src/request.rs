use netprobe_core::{ProbeError, Result, Target};
use os_tools::PingOptions;
use std::str::FromStr;
use std::time::Duration;

/// Ports checked by `all` mode when the caller names none.
pub const DEFAULT_ALL_PORTS: [u16; 3] = [22, 80, 443];

const PING_COUNT: u32 = 3;
const PING_SIZE: u32 = 56;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMode {
    Ping,
    Tcp,
    Udp,
    All,
}

impl FromStr for ProbeMode {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ping" => Ok(ProbeMode::Ping),
            "tcp" => Ok(ProbeMode::Tcp),
            "udp" => Ok(ProbeMode::Udp),
            "all" => Ok(ProbeMode::All),
            other => Err(ProbeError::Argument(format!("unknown mode {other:?}; use ping, tcp, udp or all"))),
        }
    }
}

/// A validated probe description. Built once, then only read.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    target: Target,
    mode: ProbeMode,
    ports: Vec<u16>,
    timeout: Duration,
    concurrency: Option<usize>,
    ping_count: u32,
    packet_size: u32,
}

impl ProbeRequest {
    /// `tcp` and `udp` need exactly one port; `all` falls back to
    /// [`DEFAULT_ALL_PORTS`]; `ping` ignores ports.
    pub fn new(target: &str, mode: ProbeMode, ports: Vec<u16>, timeout: Duration) -> Result<Self> {
        let target = Target::from(target);
        if target.as_str().is_empty() {
            return Err(ProbeError::Argument("target must not be empty".into()));
        }
        if timeout.is_zero() {
            return Err(ProbeError::Argument("timeout must be positive".into()));
        }
        if ports.contains(&0) {
            return Err(ProbeError::port_token("0", "out of range 1-65535"));
        }
        let ports = match mode {
            ProbeMode::Tcp | ProbeMode::Udp if ports.len() != 1 => {
                return Err(ProbeError::Argument(format!("{mode:?} mode needs exactly one port").to_lowercase()));
            }
            ProbeMode::All if ports.is_empty() => DEFAULT_ALL_PORTS.to_vec(),
            ProbeMode::Ping => Vec::new(),
            _ => ports,
        };
        Ok(ProbeRequest { target, mode, ports, timeout, concurrency: None, ping_count: PING_COUNT, packet_size: PING_SIZE })
    }

    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency = Some(limit.max(1));
        self
    }

    pub fn with_ping_count(mut self, count: u32) -> Self {
        self.ping_count = count.max(1);
        self
    }

    pub fn with_packet_size(mut self, size: u32) -> Self {
        self.packet_size = size;
        self
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn mode(&self) -> ProbeMode {
        self.mode
    }

    pub fn ports(&self) -> &[u16] {
        &self.ports
    }

    /// The single port of a tcp/udp request.
    pub fn port(&self) -> u16 {
        self.ports.first().copied().unwrap_or_default()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn concurrency(&self) -> Option<usize> {
        self.concurrency
    }

    /// Ping settings that fit inside the request timeout: each reply may
    /// take the whole timeout, and the packets are spread so the last one
    /// goes out before the deadline.
    pub fn ping_options(&self) -> PingOptions {
        let spread = self.timeout / self.ping_count.max(1);
        PingOptions {
            count: self.ping_count,
            interval: spread.clamp(Duration::from_millis(200), Duration::from_secs(1)),
            timeout: self.timeout,
            size: self.packet_size,
        }
    }
}
