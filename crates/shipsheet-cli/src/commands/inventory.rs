//! Inventory command implementation
//!
//! Lists the models a render run would see, with their cache state. Never
//! invokes an engine.

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use shipsheet_core::ModelEntry;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use super::reporting::{coded, print_banner};
use crate::cache::{self, CacheDecision};
use crate::inventory;
use crate::settings;

/// One inventoried model, as printed by `--json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryItem {
    pub key: String,
    pub group: String,
    pub subgroup: String,
    pub name: String,
    pub source_path: String,
    pub output_path: String,
    /// True when a usable sprite already exists.
    pub rendered: bool,
}

impl InventoryItem {
    pub fn new(entry: &ModelEntry, out_root: &Path) -> Self {
        let output_path = entry.output_path(out_root);
        let rendered = cache::check(&output_path, false) == CacheDecision::AlreadyRendered;
        Self {
            key: entry.key(),
            group: entry.group.clone(),
            subgroup: entry.subgroup.clone(),
            name: entry.name.clone(),
            source_path: entry.source_path.to_string_lossy().into_owned(),
            output_path: output_path.to_string_lossy().into_owned(),
            rendered,
        }
    }
}

/// Run the inventory command
///
/// # Arguments
/// * `models_root` - Root of the model tree
/// * `out_root` - Sprite root used for the cache state
/// * `config` - Catalog configuration override
/// * `json` - Print machine-readable JSON instead of coloured lines
///
/// # Returns
/// Exit code: 0 on success
pub fn run(
    models_root: &Path,
    out_root: &Path,
    config: Option<&Path>,
    json: bool,
) -> Result<ExitCode> {
    let catalog = settings::load_catalog(config, models_root)?;
    let entries = inventory::scan(models_root, &catalog.value).map_err(coded)?;
    let items: Vec<InventoryItem> = entries
        .iter()
        .map(|entry| InventoryItem::new(entry, out_root))
        .collect();

    if json {
        let output =
            serde_json::to_string_pretty(&items).context("Failed to serialize inventory")?;
        println!("{}", output);
        return Ok(ExitCode::SUCCESS);
    }

    print_banner("Shipsheet Inventory");
    println!("{} {}", "Models root:".blue().bold(), models_root.display());
    println!("{} {}", "Output root:".blue().bold(), out_root.display());
    println!();

    for item in &items {
        let state = if item.rendered {
            "cached ".green()
        } else {
            "pending".yellow()
        };
        println!("  {} {}", state, item.key);
    }

    let pending = items.iter().filter(|i| !i.rendered).count();
    println!();
    println!(
        "{} {} model(s), {} cached, {} pending",
        "INFO".blue().bold(),
        items.len(),
        items.len() - pending,
        pending
    );
    Ok(ExitCode::SUCCESS)
}

/// Default sprite root next to the models root.
pub fn default_out_root(models_root: &Path) -> PathBuf {
    models_root
        .parent()
        .map(|parent| parent.join("sprites"))
        .unwrap_or_else(|| PathBuf::from("sprites"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_cache_state() {
        let dir = tempfile::tempdir().unwrap();
        let models = dir.path().join("models");
        let sprites = dir.path().join("sprites");
        let entry =
            ModelEntry::from_relative(&models, Path::new("amarr/frigate/punisher.stl")).unwrap();

        let item = InventoryItem::new(&entry, &sprites);
        assert_eq!(item.key, "amarr/frigate/punisher");
        assert!(!item.rendered);

        let output = sprites.join("amarr/frigate/punisher.png");
        std::fs::create_dir_all(output.parent().unwrap()).unwrap();
        std::fs::write(&output, b"\x89PNG").unwrap();
        assert!(InventoryItem::new(&entry, &sprites).rendered);
    }

    #[test]
    fn test_default_out_root() {
        assert_eq!(
            default_out_root(Path::new("/data/models")),
            PathBuf::from("/data/sprites")
        );
    }
}
