//! Supervised external processes.
//!
//! Both external collaborators (the rendering engine and the compositing
//! tool) run as child processes. Every wait is bounded by a timeout and can
//! be interrupted by a [`CancelToken`]; either way the child is killed and
//! reaped before returning.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::engine::CancelToken;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Exit status and captured stderr of a finished process.
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stderr: String,
}

impl ProcessOutput {
    /// Exit code, or -1 when the process was killed by a signal.
    pub fn exit_code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }
}

/// Why a supervised process did not run to completion.
#[derive(Debug, Error)]
pub enum WaitError {
    #[error("failed to spawn process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("failed to wait for process: {0}")]
    Wait(#[source] std::io::Error),

    #[error("process timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    #[error("process cancelled")]
    Cancelled,
}

/// Runs `cmd` to completion, killing it on timeout or cancellation.
///
/// While the child runs it is counted on `cancel`, see
/// [`CancelToken::wait_for_children`].
///
/// Stdin and stdout are detached; stderr is drained on a helper thread so a
/// chatty child can never block on a full pipe.
pub fn run_supervised(
    cmd: &mut Command,
    timeout: Duration,
    cancel: Option<&CancelToken>,
) -> Result<ProcessOutput, WaitError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(WaitError::Spawn)?;
    // Counted until the child is reaped on every return path below.
    let _tracked = cancel.map(CancelToken::track_child);
    let stderr_reader = drain_stderr(&mut child);
    let start = Instant::now();

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if cancel.is_some_and(CancelToken::is_cancelled) {
                    terminate(&mut child, stderr_reader);
                    return Err(WaitError::Cancelled);
                }
                if start.elapsed() > timeout {
                    terminate(&mut child, stderr_reader);
                    return Err(WaitError::Timeout {
                        timeout_secs: timeout.as_secs(),
                    });
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                terminate(&mut child, stderr_reader);
                return Err(WaitError::Wait(e));
            }
        }
    };

    let stderr = stderr_reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();

    Ok(ProcessOutput { status, stderr })
}

fn drain_stderr(child: &mut Child) -> Option<JoinHandle<String>> {
    let mut pipe = child.stderr.take()?;
    Some(std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }))
}

fn terminate(child: &mut Child, stderr_reader: Option<JoinHandle<String>>) {
    let _ = child.kill();
    let _ = child.wait();
    if let Some(handle) = stderr_reader {
        let _ = handle.join();
    }
}

/// Last `max_lines` non-empty lines of `text`, for compact failure details.
pub fn tail_lines(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", script]);
        cmd
    }

    #[test]
    fn test_captures_stderr_and_status() {
        let output = run_supervised(
            &mut sh("echo hello 1>&2; exit 3"),
            Duration::from_secs(5),
            None,
        )
        .unwrap();
        assert_eq!(output.exit_code(), 3);
        assert!(output.stderr.contains("hello"));
    }

    #[test]
    fn test_timeout_kills_child() {
        let start = Instant::now();
        let err = run_supervised(&mut sh("sleep 30"), Duration::from_millis(200), None)
            .unwrap_err();
        assert!(matches!(err, WaitError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_cancellation_kills_child() {
        let token = CancelToken::new();
        token.cancel();
        let err = run_supervised(&mut sh("sleep 30"), Duration::from_secs(30), Some(&token))
            .unwrap_err();
        assert!(matches!(err, WaitError::Cancelled));
        assert_eq!(token.live_children(), 0);
    }

    #[test]
    fn test_cancel_mid_run_kills_and_reaps_child() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("late.txt");
        let token = CancelToken::new();

        let canceller = {
            let token = token.clone();
            std::thread::spawn(move || {
                let start = Instant::now();
                while token.live_children() == 0 && start.elapsed() < Duration::from_secs(10) {
                    std::thread::sleep(Duration::from_millis(10));
                }
                token.cancel();
                token.wait_for_children(Duration::from_secs(10))
            })
        };

        let start = Instant::now();
        let script = format!("sleep 30; echo late > '{}'", marker.display());
        let err = run_supervised(&mut sh(&script), Duration::from_secs(60), Some(&token))
            .unwrap_err();
        assert!(matches!(err, WaitError::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(20));
        assert!(canceller.join().unwrap());
        assert_eq!(token.live_children(), 0);
        assert!(!marker.exists());
    }

    #[test]
    fn test_spawn_failure() {
        let mut cmd = Command::new("/definitely/not/a/real/program");
        let err = run_supervised(&mut cmd, Duration::from_secs(1), None).unwrap_err();
        assert!(matches!(err, WaitError::Spawn(_)));
    }

    #[test]
    fn test_large_stderr_does_not_block() {
        let output = run_supervised(
            &mut sh("i=0; while [ $i -lt 20000 ]; do echo line-$i 1>&2; i=$((i+1)); done"),
            Duration::from_secs(30),
            None,
        )
        .unwrap();
        assert!(output.status.success());
        assert_eq!(tail_lines(&output.stderr, 1), "line-19999");
    }

    #[test]
    fn test_tail_lines() {
        assert_eq!(tail_lines("a\n\nb\nc\n", 2), "b\nc");
        assert_eq!(tail_lines("", 3), "");
    }
}
