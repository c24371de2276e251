//! Sprite grouping.
//!
//! Re-scans the render output root for sprites. Results of the render phase
//! are never consulted, so packing can run on its own against whatever is on
//! disk.

use std::path::{Path, PathBuf};

use shipsheet_core::{CatalogConfig, SpriteGroup, SpriteMember, StageError, SPRITE_EXTENSION};
use thiserror::Error;
use walkdir::WalkDir;

use crate::inventory::{check_root, InventoryError};

/// Errors scanning the sprite tree.
#[derive(Debug, Error)]
pub enum GroupingError {
    /// The sprite root is missing or not a directory.
    #[error(transparent)]
    Root(#[from] InventoryError),

    /// A directory under the sprite root could not be read.
    #[error("Failed to read {path}: {message}")]
    Unreadable { path: PathBuf, message: String },
}

impl StageError for GroupingError {
    fn code(&self) -> &'static str {
        match self {
            GroupingError::Root(e) => e.code(),
            GroupingError::Unreadable { .. } => "GROUPING_001",
        }
    }

    fn category(&self) -> &'static str {
        "grouping"
    }
}

fn is_sprite_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(SPRITE_EXTENSION))
}

/// Lists the included group directories directly under `sprite_root`,
/// sorted by name.
pub fn discover_groups(
    sprite_root: &Path,
    catalog: &CatalogConfig,
) -> Result<Vec<String>, GroupingError> {
    check_root(sprite_root)?;

    let read_dir = std::fs::read_dir(sprite_root).map_err(|e| GroupingError::Unreadable {
        path: sprite_root.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut groups = Vec::new();
    for item in read_dir {
        let item = item.map_err(|e| GroupingError::Unreadable {
            path: sprite_root.to_path_buf(),
            message: e.to_string(),
        })?;
        let is_dir = item.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir {
            continue;
        }
        let Ok(name) = item.file_name().into_string() else {
            continue;
        };
        if catalog.includes_group(&name) {
            groups.push(name);
        }
    }

    groups.sort();
    Ok(groups)
}

/// Collects every sprite under `<sprite_root>/<group>` into a group in
/// packing order. A missing group directory yields an empty group.
pub fn scan_group(
    sprite_root: &Path,
    group: &str,
    catalog: &CatalogConfig,
) -> Result<SpriteGroup, GroupingError> {
    let group_dir = sprite_root.join(group);
    if !group_dir.is_dir() {
        return Ok(SpriteGroup::new(group, Vec::new()));
    }

    let walker = WalkDir::new(&group_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e.file_type().is_dir()
                || e.file_name().to_str().is_some_and(|n| !catalog.is_excluded_dir(n))
        });

    let mut members = Vec::new();
    for item in walker {
        let item = item.map_err(|e| GroupingError::Unreadable {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| group_dir.clone()),
            message: e.to_string(),
        })?;
        if !item.file_type().is_file() || !is_sprite_file(item.path()) {
            continue;
        }
        let Ok(relative) = item.path().strip_prefix(&group_dir) else {
            continue;
        };
        if let Some(member) = SpriteMember::from_relative(&group_dir, relative) {
            members.push(member);
        }
    }

    Ok(SpriteGroup::new(group, members))
}
