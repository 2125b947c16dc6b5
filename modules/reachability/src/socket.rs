use crate::request::ProbeMode;
use crate::result::{Evidence, ProbeResult};
use netprobe_core::resolve::resolve_ip;
use netprobe_core::timing::elapsed_ms;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::{Duration, Instant};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;
use tracing::debug;

/// One TCP connect bounded by `deadline` (name resolution included).
pub async fn probe_tcp(target: &str, port: u16, deadline: Duration) -> ProbeResult {
    let started = Instant::now();
    let attempt = timeout(deadline, async {
        let ip = resolve_ip(target, deadline).await.map_err(|e| e.to_string())?;
        TcpStream::connect(SocketAddr::new(ip, port)).await.map_err(|e| e.to_string())
    })
    .await;
    let elapsed = elapsed_ms(started);
    let mut result = ProbeResult::new(target, ProbeMode::Tcp, Some(port), Evidence::TcpHandshake);
    match attempt {
        Ok(Ok(_stream)) => {
            result.success = true;
            result.response_time_ms = elapsed;
            result.message = format!("Successfully connected to {}:{} in {}ms", target, port, elapsed);
        }
        Ok(Err(e)) => result.message = format!("Could not connect to {}:{} - {}", target, port, e),
        Err(_) => result.message = format!("Could not connect to {}:{} - timed out after {:?}", target, port, deadline),
    }
    debug!(target, port, success = result.success, "tcp probe");
    result
}

/// Send one datagram. Success only means the local stack accepted it; no
/// reply is awaited, so a filtered or closed port looks the same as an open
/// one.
pub async fn probe_udp(target: &str, port: u16, deadline: Duration) -> ProbeResult {
    let started = Instant::now();
    let attempt = timeout(deadline, async {
        let ip = resolve_ip(target, deadline).await.map_err(|e| e.to_string())?;
        let local: IpAddr = if ip.is_ipv4() { Ipv4Addr::UNSPECIFIED.into() } else { Ipv6Addr::UNSPECIFIED.into() };
        let socket = UdpSocket::bind(SocketAddr::new(local, 0)).await.map_err(|e| e.to_string())?;
        socket.connect(SocketAddr::new(ip, port)).await.map_err(|e| e.to_string())?;
        socket.send(b"ping").await.map_err(|e| e.to_string())
    })
    .await;
    let mut result = ProbeResult::new(target, ProbeMode::Udp, Some(port), Evidence::LocalWrite);
    result.response_time_ms = elapsed_ms(started);
    match attempt {
        Ok(Ok(_)) => {
            result.success = true;
            result.message = format!(
                "UDP port {} on {} appears reachable (best-effort: datagram accepted locally, no reply checked)",
                port, target
            );
        }
        Ok(Err(e)) => result.message = format!("UDP port {} on {} appears unreachable - {}", port, target, e),
        Err(_) => result.message = format!("UDP port {} on {} appears unreachable - timed out after {:?}", port, target, deadline),
    }
    result
}
