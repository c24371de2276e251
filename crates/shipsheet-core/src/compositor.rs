//! Sheet compositor boundary.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::error::StageError;
use crate::grid::GridPlan;

/// One compositing request: equal-size images in packing order, the grid
/// they are laid out on, and the sheet file to produce.
#[derive(Debug, Clone, Copy)]
pub struct CompositeRequest<'a> {
    pub images: &'a [PathBuf],
    pub plan: &'a GridPlan,
    pub output_path: &'a Path,
}

impl CompositeRequest<'_> {
    /// Rejects requests that cannot produce a sheet at all.
    pub fn check(&self) -> Result<(), CompositeError> {
        if self.images.is_empty() {
            return Err(CompositeError::NoImages);
        }
        let count = self.images.len() as u64;
        if count > self.plan.capacity() {
            return Err(CompositeError::TooManyImages {
                count,
                capacity: self.plan.capacity(),
            });
        }
        Ok(())
    }
}

/// A compositor draws a group's images into one sheet.
pub trait Compositor: Send + Sync {
    /// Short compositor name for logs.
    fn name(&self) -> &'static str;

    /// Produces `request.output_path`. On success the file exists and is
    /// non-empty.
    fn compose(&self, request: &CompositeRequest<'_>) -> Result<(), CompositeError>;
}

/// Errors producing a sheet. Fatal to the affected group only.
#[derive(Debug, Error)]
pub enum CompositeError {
    /// Nothing to composite.
    #[error("No images to composite")]
    NoImages,

    /// The grid cannot hold every image.
    #[error("{count} images do not fit a grid of {capacity} cells")]
    TooManyImages { count: u64, capacity: u64 },

    /// An image is not the fixed cell size.
    #[error("{path} is {width}x{height}, expected {cell_size}x{cell_size}")]
    CellSizeMismatch {
        path: PathBuf,
        width: u32,
        height: u32,
        cell_size: u32,
    },

    /// An input image could not be decoded.
    #[error("Failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// The sheet could not be encoded.
    #[error("Failed to encode sheet: {message}")]
    Encode { message: String },

    /// Filesystem error.
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The external compositing tool is not installed.
    #[error("Compositing tool '{tool}' not found in PATH")]
    ToolNotFound { tool: String },

    /// The external compositing tool exited with non-zero status.
    #[error("Compositor exited with status {exit_code}: {stderr}")]
    ProcessFailed { exit_code: i32, stderr: String },

    /// The external compositing tool exceeded its time budget.
    #[error("Compositor timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The compositor reported success but left no usable sheet.
    #[error("Compositor produced no output at {path}")]
    MissingOutput { path: PathBuf },

    /// The compositor wrote a sheet whose size disagrees with the plan.
    #[error("Sheet {path} is {width}x{height}, expected {expected_width}x{expected_height}")]
    SheetSizeMismatch {
        path: PathBuf,
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },

    /// The compositor cannot honour part of the request.
    #[error("Unsupported by {compositor} compositor: {message}")]
    Unsupported {
        compositor: &'static str,
        message: String,
    },
}

impl CompositeError {
    /// Creates a new IO error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl StageError for CompositeError {
    fn code(&self) -> &'static str {
        match self {
            CompositeError::NoImages => "SHEET_001",
            CompositeError::TooManyImages { .. } => "SHEET_002",
            CompositeError::CellSizeMismatch { .. } => "SHEET_003",
            CompositeError::Decode { .. } => "SHEET_004",
            CompositeError::Encode { .. } => "SHEET_005",
            CompositeError::Io { .. } => "SHEET_006",
            CompositeError::ToolNotFound { .. } => "SHEET_007",
            CompositeError::ProcessFailed { .. } => "SHEET_008",
            CompositeError::Timeout { .. } => "SHEET_009",
            CompositeError::MissingOutput { .. } => "SHEET_010",
            CompositeError::Unsupported { .. } => "SHEET_011",
            CompositeError::SheetSizeMismatch { .. } => "SHEET_012",
        }
    }

    fn category(&self) -> &'static str {
        "sheet"
    }
}
