//! Model inventory.
//!
//! Enumerates model files under a root directory into a deterministically
//! ordered list of [`ModelEntry`] values. Groups and skipped directories come
//! from the validated [`CatalogConfig`]; the scan itself never interprets
//! directory names.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use shipsheet_core::{CatalogConfig, ModelEntry, StageError};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Errors enumerating the model tree. Always fatal: no work starts.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The root directory does not exist.
    #[error("Inventory root does not exist: {path}")]
    RootMissing { path: PathBuf },

    /// The root exists but is not a directory.
    #[error("Inventory root is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// A directory under the root could not be read.
    #[error("Failed to read {path}: {message}")]
    Unreadable { path: PathBuf, message: String },

    /// Two model files would render to the same sprite.
    #[error("{first} and {second} would both render to {output}")]
    OutputCollision {
        output: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },
}

impl StageError for InventoryError {
    fn code(&self) -> &'static str {
        match self {
            InventoryError::RootMissing { .. } => "INVENTORY_001",
            InventoryError::NotADirectory { .. } => "INVENTORY_002",
            InventoryError::Unreadable { .. } => "INVENTORY_003",
            InventoryError::OutputCollision { .. } => "INVENTORY_004",
        }
    }

    fn category(&self) -> &'static str {
        "inventory"
    }
}

/// Checks that `root` is an existing directory.
pub fn check_root(root: &Path) -> Result<(), InventoryError> {
    match std::fs::metadata(root) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(InventoryError::NotADirectory {
            path: root.to_path_buf(),
        }),
        Err(_) => Err(InventoryError::RootMissing {
            path: root.to_path_buf(),
        }),
    }
}

/// True when the walker should descend into (or yield) `entry`.
///
/// Excluded directory names are skipped at any depth; top-level directories
/// are additionally filtered by group policy.
fn should_visit(entry: &DirEntry, catalog: &CatalogConfig) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return true;
    }
    let Some(name) = entry.file_name().to_str() else {
        return false;
    };
    if entry.depth() == 1 {
        catalog.includes_group(name)
    } else {
        !catalog.is_excluded_dir(name)
    }
}

/// Scans `root` for model files.
///
/// Entries are ordered by group, subgroup and name, so an unchanged tree
/// always yields the same sequence. An existing but empty root yields an
/// empty list. Models sharing a stem in one directory (`x.stl` next to
/// `x.STL` or `x.obj`) are rejected, since their sprites would collide.
pub fn scan(root: &Path, catalog: &CatalogConfig) -> Result<Vec<ModelEntry>, InventoryError> {
    check_root(root)?;

    let mut entries = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| should_visit(e, catalog));

    for item in walker {
        let item = item.map_err(|e| InventoryError::Unreadable {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf()),
            message: e.to_string(),
        })?;

        if !item.file_type().is_file() || !catalog.is_model_file(item.path()) {
            continue;
        }
        let Ok(relative) = item.path().strip_prefix(root) else {
            continue;
        };
        if let Some(entry) = ModelEntry::from_relative(root, relative) {
            entries.push(entry);
        }
    }

    entries.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
    check_distinct_outputs(&entries)?;
    Ok(entries)
}

/// Fails on the first pair of entries mapping to the same sprite path.
fn check_distinct_outputs(entries: &[ModelEntry]) -> Result<(), InventoryError> {
    let mut seen: BTreeMap<PathBuf, &ModelEntry> = BTreeMap::new();
    for entry in entries {
        let output = entry.output_path(Path::new(""));
        if let Some(first) = seen.get(&output) {
            return Err(InventoryError::OutputCollision {
                output,
                first: first.relative_path.clone(),
                second: entry.relative_path.clone(),
            });
        }
        seen.insert(output, entry);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"solid").unwrap();
    }

    fn keys(entries: &[ModelEntry]) -> Vec<String> {
        entries.iter().map(ModelEntry::key).collect()
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = scan(&dir.path().join("nope"), &CatalogConfig::default()).unwrap_err();
        assert_eq!(err.code(), "INVENTORY_001");

        let file = dir.path().join("file.stl");
        std::fs::write(&file, b"x").unwrap();
        let err = scan(&file, &CatalogConfig::default()).unwrap_err();
        assert_eq!(err.code(), "INVENTORY_002");
    }

    #[test]
    fn test_empty_root_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan(dir.path(), &CatalogConfig::default()).unwrap().is_empty());
    }

    #[test]
    fn test_scan_order_and_fields() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "minmatar/frigate/rifter.stl");
        touch(root, "amarr/frigate/punisher.STL");
        touch(root, "amarr/cruiser/omen.stl");
        touch(root, "amarr/avatar.stl");
        touch(root, "amarr/cruiser/notes.txt");
        touch(root, "loose.stl");

        let entries = scan(root, &CatalogConfig::default()).unwrap();
        assert_eq!(
            keys(&entries),
            vec![
                "amarr/avatar",
                "amarr/cruiser/omen",
                "amarr/frigate/punisher",
                "minmatar/frigate/rifter",
            ]
        );

        let omen = &entries[1];
        assert_eq!(omen.group, "amarr");
        assert_eq!(omen.subgroup, "cruiser");
        assert_eq!(omen.name, "omen");
        assert_eq!(omen.source_path, root.join("amarr/cruiser/omen.stl"));
    }

    #[test]
    fn test_models_directly_in_group_come_first() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "amarr/alpha/x.stl");
        touch(root, "amarr/zeta.stl");
        touch(root, "amarr/a-b.stl");
        touch(root, "amarr/a.stl");

        let entries = scan(root, &CatalogConfig::default()).unwrap();
        assert_eq!(
            keys(&entries),
            vec!["amarr/a", "amarr/a-b", "amarr/zeta", "amarr/alpha/x"]
        );
    }

    #[test]
    fn test_shared_stem_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "amarr/frigate/punisher.stl");
        touch(root, "amarr/frigate/punisher.obj");
        touch(root, "amarr/frigate/tormentor.stl");

        let catalog =
            CatalogConfig::from_json(r#"{ "model_extensions": ["stl", "obj"] }"#).unwrap();
        let err = scan(root, &catalog).unwrap_err();
        assert_eq!(err.code(), "INVENTORY_004");
        match err {
            InventoryError::OutputCollision {
                output,
                first,
                second,
            } => {
                assert_eq!(output, PathBuf::from("amarr/frigate/punisher.png"));
                assert_eq!(first, PathBuf::from("amarr/frigate/punisher.obj"));
                assert_eq!(second, PathBuf::from("amarr/frigate/punisher.stl"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_distinct_stems_with_mixed_extensions_are_fine() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "amarr/frigate/punisher.stl");
        touch(root, "amarr/frigate/tormentor.obj");

        let catalog =
            CatalogConfig::from_json(r#"{ "model_extensions": ["stl", "obj"] }"#).unwrap();
        assert_eq!(scan(root, &catalog).unwrap().len(), 2);
    }

    #[test]
    fn test_repeated_scans_are_identical() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c/x/3.stl", "a/y/1.stl", "b/2.stl", "a/x/9.stl"] {
            touch(dir.path(), name);
        }
        let first = scan(dir.path(), &CatalogConfig::default()).unwrap();
        let second = scan(dir.path(), &CatalogConfig::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_excluded_dirs_and_group_policy() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "amarr/frigate/punisher.stl");
        touch(root, "amarr/__pycache__/junk.stl");
        touch(root, "jove/special/nemesis.stl");
        touch(root, "sheets/amarr.stl");
        touch(root, "vendor/frigate/thing.stl");

        let catalog = CatalogConfig::from_json(
            r#"{ "groups": { "jove": "exclude" }, "excluded_dirs": ["vendor", "__pycache__"] }"#,
        )
        .unwrap();
        let entries = scan(root, &catalog).unwrap();
        assert_eq!(keys(&entries), vec!["amarr/frigate/punisher"]);
    }
}
