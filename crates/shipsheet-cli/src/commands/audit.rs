//! Audit command implementation
//!
//! Draws a labelled contact sheet per group, and optionally one master sheet
//! with every group, for visual review of the rendered sprites.

use anyhow::Result;
use colored::Colorize;
use shipsheet_backend_sheet::audit::{
    accent_for, group_sheet, group_sheet_file, master_sheet, AuditLayout, AuditSheet,
    MASTER_SHEET_FILE,
};
use shipsheet_core::{CatalogConfig, SpriteGroup};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use super::reporting::{coded, print_banner};
use crate::grouping::{discover_groups, scan_group};
use crate::settings::{self, print_source};

/// Default audit output directory under the sprite root.
pub const AUDIT_DIR: &str = "audit_sheets";

/// Inputs of one audit run.
#[derive(Debug, Clone)]
pub struct AuditOptions {
    pub sprite_root: PathBuf,
    /// Output directory; defaults to `<sprite_root>/audit_sheets`.
    pub out_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub thumb_size: u32,
    pub columns: u32,
    /// Also draw the master sheet.
    pub master: bool,
}

/// What one audit run wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditReport {
    pub sheets: Vec<PathBuf>,
    pub sprites: usize,
    pub unreadable: usize,
}

/// Run the audit command
///
/// # Returns
/// Exit code: 0 when at least one sheet was drawn, 1 when no sprites exist
pub fn run(options: &AuditOptions) -> Result<ExitCode> {
    let report = execute(options)?;
    if report.sheets.is_empty() {
        println!("{} No sprites found", "WARN".yellow().bold());
        return Ok(ExitCode::from(1));
    }
    println!(
        "{} {} sheet(s), {} sprite(s)",
        "OK".green().bold(),
        report.sheets.len(),
        report.sprites
    );
    Ok(ExitCode::SUCCESS)
}

/// Draws and writes every audit sheet.
pub fn execute(options: &AuditOptions) -> Result<AuditReport> {
    let sprite_root = options.sprite_root.as_path();
    let out_dir = options
        .out_dir
        .clone()
        .unwrap_or_else(|| sprite_root.join(AUDIT_DIR));

    print_banner("Shipsheet Audit");
    println!("{} {}", "Sprite root:".blue().bold(), sprite_root.display());
    println!("{} {}", "Output:".blue().bold(), out_dir.display());
    println!(
        "{} {}px, {} columns",
        "Thumbnails:".blue().bold(),
        options.thumb_size,
        options.columns
    );
    println!();

    let catalog = settings::load_catalog(options.config.as_deref(), sprite_root)?;
    print_source("Catalog:", &catalog);
    warn_if_scanned(sprite_root, &out_dir, &catalog.value);

    let groups = discover_groups(sprite_root, &catalog.value)
        .map_err(coded)?
        .iter()
        .map(|group| scan_group(sprite_root, group, &catalog.value).map_err(coded))
        .collect::<Result<Vec<SpriteGroup>>>()?;

    let mut report = AuditReport::default();
    let layout = AuditLayout::group(options.thumb_size, options.columns);
    for (index, group) in groups.iter().enumerate() {
        if group.is_empty() {
            println!("{} {} (no sprites)", "SKIP".yellow().bold(), group.group());
            continue;
        }
        let sheet = group_sheet(group, &layout, accent_for(index));
        let path = out_dir.join(group_sheet_file(group.group()));
        write_sheet(&sheet, &path, &mut report)?;
    }

    if options.master && report.sprites > 0 {
        let sheet = master_sheet(&groups, &AuditLayout::master());
        let path = out_dir.join(MASTER_SHEET_FILE);
        let sprites = report.sprites;
        write_sheet(&sheet, &path, &mut report)?;
        report.sprites = sprites;
    }

    Ok(report)
}

fn write_sheet(sheet: &AuditSheet, path: &Path, report: &mut AuditReport) -> Result<()> {
    sheet.write(path).map_err(coded)?;
    println!(
        "{} {} ({} sprites)",
        "OK".green().bold(),
        path.display(),
        sheet.sprite_count
    );
    for unreadable in &sheet.unreadable {
        println!(
            "{} could not decode {}",
            "WARN".yellow().bold(),
            unreadable.display()
        );
    }
    report.sheets.push(path.to_path_buf());
    report.sprites += sheet.sprite_count;
    report.unreadable += sheet.unreadable.len();
    Ok(())
}

/// An output directory directly under the sprite root would be picked up as
/// a group by later scans unless the catalog excludes it.
fn warn_if_scanned(sprite_root: &Path, out_dir: &Path, catalog: &CatalogConfig) {
    if out_dir.parent() != Some(sprite_root) {
        return;
    }
    let Some(name) = out_dir.file_name().and_then(|n| n.to_str()) else {
        return;
    };
    if catalog.includes_group(name) {
        println!(
            "{} {} is not excluded by the catalog and will be scanned as a group",
            "WARN".yellow().bold(),
            out_dir.display()
        );
    }
}
