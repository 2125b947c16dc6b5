//! Presentation strategies for a sweep. Exactly one is active per run.

use crate::host::HostInfo;
use colored::Colorize;
use port_scan::service_name;
use std::io::{self, Write};
use std::sync::Mutex;

/// Receives sweep events. Called from worker tasks, so implementations
/// serialize their own output.
pub trait SweepSink: Send + Sync {
    fn started(&self, _cidr: &str, _total: usize) {}
    fn host_done(&self, _info: &HostInfo) {}
    /// Whether the progress poller should run at all.
    fn wants_progress(&self) -> bool {
        false
    }
    fn progress(&self, _done: usize, _total: usize) {}
    /// `results` are ordered by address.
    fn finished(&self, results: &[HostInfo]) -> io::Result<()>;
}

/// One JSON array of every host, written once at the end.
#[derive(Debug, Default)]
pub struct JsonSink;

impl SweepSink for JsonSink {
    fn finished(&self, results: &[HostInfo]) -> io::Result<()> {
        let mut out = io::stdout().lock();
        serde_json::to_writer(&mut out, results)?;
        writeln!(out)
    }
}

/// Colored per-host lines as hosts complete, then a summary.
#[derive(Debug, Default)]
pub struct LiveSink {
    pub verbose: bool,
    pub show_progress: bool,
    lock: Mutex<()>,
}

impl LiveSink {
    pub fn new(verbose: bool, show_progress: bool) -> Self {
        LiveSink { verbose, show_progress, lock: Mutex::new(()) }
    }

    fn print(&self, text: &str) {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut out = io::stdout().lock();
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }
}

impl SweepSink for LiveSink {
    fn started(&self, cidr: &str, total: usize) {
        self.print(&format!("Starting scan of {} hosts in {}\n", total, cidr));
    }

    fn host_done(&self, info: &HostInfo) {
        let text = if self.verbose { host_block(info) } else { format!("\r\n{}", host_line(info)) };
        self.print(&text);
    }

    fn wants_progress(&self) -> bool {
        self.show_progress
    }

    fn progress(&self, done: usize, total: usize) {
        self.print(&progress_line(done, total));
    }

    fn finished(&self, results: &[HostInfo]) -> io::Result<()> {
        let reachable = results.iter().filter(|h| h.is_reachable).count();
        let mut text = format!(
            "\n\nScan complete. {} hosts scanned.\nHosts responding: {}\n\nDetailed Results:\n",
            results.len(),
            reachable
        );
        for host in results {
            text.push_str(&host_summary(host));
            text.push('\n');
        }
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut out = io::stdout().lock();
        out.write_all(text.as_bytes())?;
        out.flush()
    }
}

pub fn format_ports(ports: &[u16]) -> String {
    ports
        .iter()
        .map(|&p| match service_name(p) {
            Some(svc) => format!("{} ({})", p, svc),
            None => p.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn status_mark(reachable: bool) -> String {
    if reachable {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    }
}

pub fn progress_line(done: usize, total: usize) -> String {
    let pct = if total == 0 { 100.0 } else { done as f64 / total as f64 * 100.0 };
    format!("\r{} {}", "Progress:".blue(), format!("{:.1}% ({}/{} hosts scanned)", pct, done, total).yellow())
}

pub fn host_line(info: &HostInfo) -> String {
    let mut line = format!("{} {}", status_mark(info.is_reachable), info.ip_address.cyan());
    if let Some(name) = &info.hostname {
        line.push_str(&format!(" ({})", name.yellow()));
    }
    line.push_str(&format!(" - {}", format!("{} open ports", info.open_ports.len()).purple()));
    line
}

pub fn host_block(info: &HostInfo) -> String {
    let rule = "===========================================".blue();
    let ps = &info.ping_stats;
    let mut b = format!("\r\n{}\n{} {}\n", rule, "Host:".dimmed(), info.ip_address.cyan());
    if let Some(name) = &info.hostname {
        b.push_str(&format!("{} {}\n", "Hostname:".dimmed(), name.yellow()));
    }
    let status = if info.is_reachable { "Reachable".green() } else { "Unreachable".red() };
    b.push_str(&format!("{} {}\n", "Status:".dimmed(), status));
    b.push_str(&format!("\n{}\n", "Ping Statistics:".blue()));
    b.push_str(&format!(
        "  {} {} sent, {} received, {:.1}% loss\n",
        "Packets:".dimmed(),
        ps.packets_sent,
        ps.packets_received,
        ps.packet_loss
    ));
    if ps.packets_received > 0 {
        b.push_str(&format!(
            "  {} {:.2} ms min, {:.2} ms avg, {:.2} ms max\n",
            "Latency:".dimmed(),
            ps.min_latency_ms,
            ps.avg_latency_ms,
            ps.max_latency_ms
        ));
        b.push_str(&format!("  {} {:.2} ms\n", "Jitter:".dimmed(), ps.jitter_ms));
    }
    if !info.open_ports.is_empty() {
        b.push_str(&format!("\n{} {}\n", "Open Ports:".blue(), format_ports(&info.open_ports).purple()));
    }
    if let Some(e) = &ps.error_message {
        b.push_str(&format!("\n{} {}\n", "Error:".red(), e.red()));
    }
    b.push_str(&format!("{}\n", rule));
    b
}

/// Compact entry for the final listing.
pub fn host_summary(info: &HostInfo) -> String {
    let mut s = format!("\n{}", host_line_head(info));
    let ps = &info.ping_stats;
    if ps.packets_received > 0 {
        s.push_str(&format!(
            "\n  {} {:.1}ms min / {:.1}ms avg / {:.1}ms max",
            "Latency:".dimmed(),
            ps.min_latency_ms,
            ps.avg_latency_ms,
            ps.max_latency_ms
        ));
        s.push_str(&format!(
            "\n  {} {:.1}% ({}/{})",
            "Packet Loss:".dimmed(),
            ps.packet_loss,
            ps.packets_received,
            ps.packets_sent
        ));
    }
    if !info.open_ports.is_empty() {
        s.push_str(&format!("\n  {} {}", "Open Ports:".blue(), format_ports(&info.open_ports).purple()));
    }
    s
}

fn host_line_head(info: &HostInfo) -> String {
    let mut s = format!("{} {}", status_mark(info.is_reachable), info.ip_address.cyan());
    if let Some(name) = &info.hostname {
        s.push_str(&format!(" ({})", name.yellow()));
    }
    s
}
