//! Render outcome classification.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::entry::ModelEntry;

/// Non-fatal render failures. Recorded and counted; the batch continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderFailure {
    /// The engine succeeded but the output is missing or empty.
    EmptyOutput,
    /// The engine reported failure.
    EngineError,
    /// The engine exceeded its time budget.
    Timeout,
}

/// Classification of one render attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStatus {
    Rendered,
    SkippedExisting,
    FailedEmptyOutput,
    FailedEngineError,
    FailedTimeout,
}

impl RenderStatus {
    pub fn is_failure(&self) -> bool {
        self.failure().is_some()
    }

    /// The failure kind, if this status is a failure.
    pub fn failure(&self) -> Option<RenderFailure> {
        match self {
            RenderStatus::FailedEmptyOutput => Some(RenderFailure::EmptyOutput),
            RenderStatus::FailedEngineError => Some(RenderFailure::EngineError),
            RenderStatus::FailedTimeout => Some(RenderFailure::Timeout),
            RenderStatus::Rendered | RenderStatus::SkippedExisting => None,
        }
    }

    /// Short label for per-item log lines.
    pub fn label(&self) -> &'static str {
        match self {
            RenderStatus::Rendered => "RENDERED",
            RenderStatus::SkippedExisting => "SKIPPED",
            RenderStatus::FailedEmptyOutput => "EMPTY",
            RenderStatus::FailedEngineError => "FAILED",
            RenderStatus::FailedTimeout => "TIMEOUT",
        }
    }
}

impl From<RenderFailure> for RenderStatus {
    fn from(failure: RenderFailure) -> Self {
        match failure {
            RenderFailure::EmptyOutput => RenderStatus::FailedEmptyOutput,
            RenderFailure::EngineError => RenderStatus::FailedEngineError,
            RenderFailure::Timeout => RenderStatus::FailedTimeout,
        }
    }
}

impl std::fmt::Display for RenderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RenderStatus::Rendered => "rendered",
            RenderStatus::SkippedExisting => "skipped_existing",
            RenderStatus::FailedEmptyOutput => "failed_empty_output",
            RenderStatus::FailedEngineError => "failed_engine_error",
            RenderStatus::FailedTimeout => "failed_timeout",
        };
        f.write_str(s)
    }
}

/// Result of attempting to render one entry.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub entry: ModelEntry,
    pub status: RenderStatus,
    pub output_path: PathBuf,
    /// Engine message for failures.
    pub detail: Option<String>,
    pub duration: Duration,
}

impl RenderOutcome {
    /// Outcome for an entry whose output already exists.
    pub fn skipped(entry: ModelEntry, output_path: PathBuf) -> Self {
        Self {
            entry,
            status: RenderStatus::SkippedExisting,
            output_path,
            detail: None,
            duration: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_mapping() {
        for failure in [
            RenderFailure::EmptyOutput,
            RenderFailure::EngineError,
            RenderFailure::Timeout,
        ] {
            let status = RenderStatus::from(failure);
            assert!(status.is_failure());
            assert_eq!(status.failure(), Some(failure));
        }
        assert!(!RenderStatus::Rendered.is_failure());
        assert!(!RenderStatus::SkippedExisting.is_failure());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&RenderStatus::FailedTimeout).unwrap();
        assert_eq!(json, "\"failed_timeout\"");
        assert_eq!(RenderStatus::FailedTimeout.to_string(), "failed_timeout");
    }
}
