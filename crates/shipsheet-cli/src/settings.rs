//! Startup configuration.
//!
//! Each configuration file is optional. An explicit path from the command
//! line must exist; otherwise the default file name is looked up in the
//! given root and used when present. Everything is loaded and validated
//! before any work starts.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use shipsheet_core::{CatalogConfig, OrientationStore, SizeTable};

/// Default catalog configuration file name.
pub const CATALOG_FILE: &str = "shipsheet.json";
/// Default orientation override file name.
pub const ORIENTATIONS_FILE: &str = "ship_orientations.json";
/// Default size table file name.
pub const SIZES_FILE: &str = "ship_sizes.json";

/// A loaded configuration value and the file it came from, if any.
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub value: T,
    pub source: Option<PathBuf>,
}

impl<T> Loaded<T> {
    /// Human-readable origin for startup logs.
    pub fn origin(&self) -> String {
        match &self.source {
            Some(path) => path.display().to_string(),
            None => "(defaults)".to_string(),
        }
    }
}

/// Finds the file to load: the explicit path, or `root/<default_name>` when
/// it exists.
pub fn locate(explicit: Option<&Path>, root: &Path, default_name: &str) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let candidate = root.join(default_name);
            candidate.is_file().then_some(candidate)
        }
    }
}

pub fn load_catalog(explicit: Option<&Path>, root: &Path) -> Result<Loaded<CatalogConfig>> {
    let source = locate(explicit, root, CATALOG_FILE);
    let value = match &source {
        Some(path) => CatalogConfig::load(path)
            .with_context(|| format!("Failed to load catalog config: {}", path.display()))?,
        None => CatalogConfig::default(),
    };
    Ok(Loaded { value, source })
}

pub fn load_orientations(
    explicit: Option<&Path>,
    root: &Path,
) -> Result<Loaded<OrientationStore>> {
    let source = locate(explicit, root, ORIENTATIONS_FILE);
    let value = match &source {
        Some(path) => OrientationStore::load(path)
            .with_context(|| format!("Failed to load orientation overrides: {}", path.display()))?,
        None => OrientationStore::empty(),
    };
    Ok(Loaded { value, source })
}

pub fn load_sizes(explicit: Option<&Path>, root: &Path) -> Result<Loaded<SizeTable>> {
    let source = locate(explicit, root, SIZES_FILE);
    let value = match &source {
        Some(path) => SizeTable::load(path)
            .with_context(|| format!("Failed to load size table: {}", path.display()))?,
        None => SizeTable::empty(),
    };
    Ok(Loaded { value, source })
}

/// Prints one `INFO` line per configuration source.
pub fn print_source<T>(label: &str, loaded: &Loaded<T>) {
    println!("{} {} {}", "INFO".blue().bold(), label, loaded.origin());
}
