//! Best-effort capture of the bytes a service volunteers on connect.

use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

const READ_BUF: usize = 1024;
pub const BANNER_MAX_CHARS: usize = 100;

/// Read once under `deadline`. Silence, errors and the deadline all yield
/// `None`.
pub async fn read_banner(stream: &mut TcpStream, deadline: Duration) -> Option<String> {
    let mut buf = vec![0u8; READ_BUF];
    let n = match timeout(deadline, stream.read(&mut buf)).await {
        Ok(Ok(n)) if n > 0 => n,
        _ => return None,
    };
    clean_banner(&buf[..n])
}

/// Trim and cap at [`BANNER_MAX_CHARS`] characters, marking the cut.
pub fn clean_banner(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if text.chars().count() <= BANNER_MAX_CHARS {
        return Some(text.to_string());
    }
    let mut cut: String = text.chars().take(BANNER_MAX_CHARS - 3).collect();
    cut.push_str("...");
    Some(cut)
}
