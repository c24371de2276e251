//! Error types for the rendering engines.

use shipsheet_core::{EngineFailure, StageError, WaitError};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for rendering engine operations.
pub type BlenderResult<T> = Result<T, BlenderError>;

/// Errors that can occur while rendering through an external engine.
#[derive(Debug, Error)]
pub enum BlenderError {
    /// Blender executable not found.
    #[error("Blender executable not found. Ensure Blender is installed and in PATH, or set BLENDER_PATH environment variable")]
    BlenderNotFound,

    /// An explicitly configured executable does not exist.
    #[error("Configured engine executable does not exist: {path}")]
    ExecutableMissing { path: PathBuf },

    /// Failed to spawn the engine process.
    #[error("Failed to spawn engine process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    /// The engine process timed out.
    #[error("Engine process timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The run was cancelled while the engine was running.
    #[error("Engine process cancelled")]
    Cancelled,

    /// The engine process exited with non-zero status.
    #[error("Engine process exited with status {exit_code}: {stderr}")]
    ProcessFailed { exit_code: i32, stderr: String },

    /// Python entrypoint script not found.
    #[error("Python entrypoint script not found at: {path}")]
    EntrypointNotFound { path: PathBuf },

    /// Failed to serialize an orientation directive for the engine.
    #[error("Failed to serialize orientation directive: {0}")]
    SerializeFailed(#[source] serde_json::Error),

    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A custom engine command is unusable.
    #[error("Invalid engine command: {message}")]
    InvalidCommand { message: String },
}

impl BlenderError {
    /// Creates a new process failed error.
    pub fn process_failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self::ProcessFailed {
            exit_code,
            stderr: stderr.into(),
        }
    }

    /// Creates a new invalid command error.
    pub fn invalid_command(message: impl Into<String>) -> Self {
        Self::InvalidCommand {
            message: message.into(),
        }
    }
}

impl StageError for BlenderError {
    fn code(&self) -> &'static str {
        match self {
            BlenderError::BlenderNotFound => "BLENDER_001",
            BlenderError::SpawnFailed(_) => "BLENDER_002",
            BlenderError::Timeout { .. } => "BLENDER_003",
            BlenderError::ProcessFailed { .. } => "BLENDER_004",
            BlenderError::Cancelled => "BLENDER_005",
            BlenderError::ExecutableMissing { .. } => "BLENDER_006",
            BlenderError::EntrypointNotFound { .. } => "BLENDER_007",
            BlenderError::SerializeFailed(_) => "BLENDER_008",
            BlenderError::Io(_) => "BLENDER_009",
            BlenderError::InvalidCommand { .. } => "BLENDER_010",
        }
    }

    fn category(&self) -> &'static str {
        "blender"
    }
}

impl From<WaitError> for BlenderError {
    fn from(err: WaitError) -> Self {
        match err {
            WaitError::Spawn(e) => BlenderError::SpawnFailed(e),
            WaitError::Wait(e) => BlenderError::Io(e),
            WaitError::Timeout { timeout_secs } => BlenderError::Timeout { timeout_secs },
            WaitError::Cancelled => BlenderError::Cancelled,
        }
    }
}

impl From<BlenderError> for EngineFailure {
    fn from(err: BlenderError) -> Self {
        match err {
            BlenderError::Timeout { timeout_secs } => EngineFailure::Timeout { timeout_secs },
            BlenderError::Cancelled => EngineFailure::Cancelled,
            other => EngineFailure::failed(format!("[{}] {}", other.code(), other)),
        }
    }
}
