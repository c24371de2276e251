//! Error codes shared by every pipeline stage.

use std::path::PathBuf;
use thiserror::Error;

/// Common trait for stage errors.
///
/// Every crate in the workspace defines its own error enum; this trait gives
/// them a uniform reporting surface so the CLI can print
/// `[BLENDER_003] Blender process timed out after 300 seconds` without
/// knowing which backend produced the error.
///
/// # Example
///
/// ```ignore
/// use shipsheet_core::StageError;
///
/// fn report<E: StageError>(err: &E) {
///     eprintln!("[{}] {}", err.code(), err.message());
/// }
/// ```
pub trait StageError: std::error::Error {
    /// Stable error code such as `"INVENTORY_001"` or `"SHEET_004"`.
    fn code(&self) -> &'static str;

    /// Human-readable message, normally the `Display` output.
    fn message(&self) -> String {
        self.to_string()
    }

    /// Error category, such as `"inventory"`, `"blender"` or `"sheet"`.
    fn category(&self) -> &'static str;
}

/// Errors loading a keyed JSON store (orientation overrides, size table).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store file could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store file is not valid JSON, or not a JSON object.
    #[error("Failed to parse store: {0}")]
    Parse(#[source] serde_json::Error),

    /// One entry of the store is malformed.
    #[error("Invalid entry '{key}': {message}")]
    InvalidEntry { key: String, message: String },
}

impl StoreError {
    /// Creates a new invalid entry error.
    pub fn invalid_entry(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEntry {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl StageError for StoreError {
    fn code(&self) -> &'static str {
        match self {
            StoreError::Read { .. } => "STORE_001",
            StoreError::Parse(_) => "STORE_002",
            StoreError::InvalidEntry { .. } => "STORE_003",
        }
    }

    fn category(&self) -> &'static str {
        "store"
    }
}

/// Returns true for keys that act as comments inside JSON stores.
pub(crate) fn is_comment_key(key: &str) -> bool {
    key.starts_with('_')
}
