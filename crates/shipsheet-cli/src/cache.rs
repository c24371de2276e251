//! Render cache check.
//!
//! An existing, non-empty, readable output file at the canonical path counts
//! as proof of a previous successful render. Contents are never compared
//! against the source model; deleting an output is how it gets invalidated.

use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Whether an entry has to be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    NeedsRender,
    AlreadyRendered,
}

/// Decides whether the output at `output_path` must be (re)rendered.
///
/// `force` bypasses the check unconditionally.
pub fn check(output_path: &Path, force: bool) -> CacheDecision {
    if !force && is_usable_output(output_path) {
        CacheDecision::AlreadyRendered
    } else {
        CacheDecision::NeedsRender
    }
}

/// True when `path` is a regular, non-empty file whose first byte can be
/// read.
pub fn is_usable_output(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() || meta.len() == 0 {
        return false;
    }
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    let mut first = [0u8; 1];
    matches!(file.read(&mut first), Ok(1))
}
