//! Deadline-bounded execution of an OS utility with output capture.

use netprobe_core::{timing::elapsed_ms, ProbeError, Result};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// How long to wait for pipes to close after the child was killed.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the child was killed at the deadline.
    pub status: Option<ExitStatus>,
    pub timed_out: bool,
    pub elapsed_ms: u64,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status.map(|s| s.success()).unwrap_or(false)
    }

    /// stdout followed by stderr, the way a terminal would show them.
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            return self.stdout.clone();
        }
        format!("{}\n{}", self.stdout, self.stderr)
    }

    pub fn describe_exit(&self) -> String {
        match (self.timed_out, self.status) {
            (true, _) => "killed at deadline".to_string(),
            (false, Some(s)) => s.to_string(),
            (false, None) => "exit status unavailable".to_string(),
        }
    }
}

/// Run `program` with `args`, killing it once `deadline` passes. Whatever the
/// child printed before it exited or was killed is returned; a nonzero exit
/// is not an error. Only failing to start the program is.
pub async fn run_tool(program: &str, args: &[String], deadline: Duration) -> Result<ToolOutput> {
    let started = Instant::now();
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ProbeError::Spawn { program: program.to_string(), source })?;
    debug!(program, ?args, ?deadline, "spawned");

    let out_task = tokio::spawn(drain(child.stdout.take()));
    let err_task = tokio::spawn(drain(child.stderr.take()));

    let (status, timed_out) = match timeout(deadline, child.wait()).await {
        Ok(Ok(status)) => (Some(status), false),
        Ok(Err(e)) => {
            warn!(program, error = %e, "wait failed");
            (None, false)
        }
        Err(_) => {
            warn!(program, ?deadline, "deadline reached, killing");
            if let Err(e) = child.kill().await {
                debug!(program, error = %e, "kill failed");
            }
            (None, true)
        }
    };

    let stdout = collect(out_task).await;
    let stderr = collect(err_task).await;
    Ok(ToolOutput { stdout, stderr, status, timed_out, elapsed_ms: elapsed_ms(started) })
}

async fn drain<R: AsyncRead + Unpin>(reader: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut r) = reader {
        // A read error still leaves what arrived so far in `buf`.
        let _ = r.read_to_end(&mut buf).await;
    }
    String::from_utf8_lossy(&buf).into_owned()
}

async fn collect(task: tokio::task::JoinHandle<String>) -> String {
    match timeout(DRAIN_GRACE, task).await {
        Ok(Ok(s)) => s,
        _ => String::new(),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn captures_stdout_and_exit() {
        let out = run_tool("sh", &sh("echo hello; echo oops >&2; exit 3"), Duration::from_secs(5)).await.unwrap();
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.stderr.trim(), "oops");
        assert!(!out.success());
        assert!(!out.timed_out);
        assert_eq!(out.status.and_then(|s| s.code()), Some(3));
    }

    #[tokio::test]
    async fn deadline_kills_and_keeps_partial_output() {
        let out = run_tool("sh", &sh("echo early; exec sleep 10"), Duration::from_millis(300)).await.unwrap();
        assert!(out.timed_out);
        assert!(out.status.is_none());
        assert_eq!(out.stdout.trim(), "early");
        assert!(out.elapsed_ms < 5_000);
    }

    #[tokio::test]
    async fn missing_binary_is_spawn_error() {
        let err = run_tool("definitely-not-a-real-tool-xyz", &[], Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ProbeError::Spawn { .. }));
    }
}
