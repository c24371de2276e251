//! Rendering engine boundary.
//!
//! The dispatcher only knows this trait. An engine receives one request,
//! blocks until the render finishes, fails, times out or is cancelled, and
//! reports which of those happened. Whether an image actually landed on
//! disk is checked separately by the caller.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::orientation::OrientationDirective;

/// One render invocation.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    /// Stable model key, for engine-side logging.
    pub key: &'a str,
    /// Model file to render.
    pub source_path: &'a Path,
    /// Image file to produce.
    pub output_path: &'a Path,
    /// Square output resolution in pixels.
    pub resolution: u32,
    /// Fraction of the frame the hull should fill.
    pub fill_ratio: f64,
    /// Orientation override, if one exists for this model.
    pub directive: Option<&'a OrientationDirective>,
}

/// Why an engine invocation did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineFailure {
    /// The invocation exceeded its time budget and was terminated.
    #[error("timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The run was cancelled while the invocation was in flight.
    #[error("cancelled")]
    Cancelled,

    /// The engine reported failure (non-zero exit, spawn error, ...).
    #[error("{message}")]
    Failed { message: String },
}

impl EngineFailure {
    /// Creates a new failed variant.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// A rendering engine.
pub trait RenderEngine: Send + Sync {
    /// Short engine name for logs.
    fn name(&self) -> &str;

    /// Renders one model. Must return promptly once `cancel` fires, leaving
    /// no engine process behind.
    fn render(&self, request: &RenderRequest<'_>, cancel: &CancelToken)
        -> Result<(), EngineFailure>;
}

/// Run-wide cancellation flag shared by every worker.
///
/// Also counts the external processes currently supervised under it, so an
/// interrupt handler can wait for every child to be killed and reaped before
/// the process exits.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    state: Arc<CancelState>,
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    live_children: AtomicUsize,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Registers a live child process until the guard is dropped.
    pub fn track_child(&self) -> ChildGuard {
        self.state.live_children.fetch_add(1, Ordering::SeqCst);
        ChildGuard {
            state: Arc::clone(&self.state),
        }
    }

    /// Number of child processes not yet reaped.
    pub fn live_children(&self) -> usize {
        self.state.live_children.load(Ordering::SeqCst)
    }

    /// Blocks until no child is live or `limit` elapses. Returns true when
    /// every child was reaped.
    pub fn wait_for_children(&self, limit: Duration) -> bool {
        let start = Instant::now();
        while self.live_children() > 0 {
            if start.elapsed() >= limit {
                return false;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        true
    }
}

/// Keeps a child process counted by its [`CancelToken`].
#[derive(Debug)]
pub struct ChildGuard {
    state: Arc<CancelState>,
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        self.state.live_children.fetch_sub(1, Ordering::SeqCst);
    }
}
