//! Pack command implementation
//!
//! Packs the sprites of every included group into one sheet plus metadata.

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use shipsheet_backend_sheet::{MontageCompositor, RasterCompositor};
use shipsheet_core::Compositor;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use super::reporting::{coded, print_banner};
use crate::grouping::discover_groups;
use crate::pack::{GroupPackOutcome, PackSettings, PackStatus, Packer};
use crate::settings::{self, print_source};

/// Sheet compositor selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum CompositorKind {
    /// In-process compositing with deterministic PNG output
    #[default]
    Raster,
    /// ImageMagick `montage`
    Montage,
}

impl CompositorKind {
    /// Builds the compositor; `montage` requires ImageMagick in `PATH`.
    pub fn build(self, montage_timeout: Duration) -> Result<Box<dyn Compositor>> {
        match self {
            CompositorKind::Raster => Ok(Box::new(RasterCompositor::new())),
            CompositorKind::Montage => {
                let compositor = MontageCompositor::new().map_err(coded)?;
                Ok(Box::new(compositor.timeout(montage_timeout)))
            }
        }
    }
}

/// Inputs of one pack run.
#[derive(Debug, Clone)]
pub struct PackOptions {
    pub sprite_root: PathBuf,
    /// Catalog configuration; defaults to `shipsheet.json` in the sprite
    /// root when present.
    pub config: Option<PathBuf>,
    pub compositor: CompositorKind,
    pub montage_timeout_secs: u64,
    pub settings: PackSettings,
}

/// Totals of one pack run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackReport {
    pub packed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl PackReport {
    pub fn from_outcomes(outcomes: &[GroupPackOutcome]) -> Self {
        let mut report = Self::default();
        for outcome in outcomes {
            match outcome.status {
                PackStatus::Packed => report.packed += 1,
                PackStatus::SkippedEmpty => report.skipped += 1,
                PackStatus::Failed => report.failed += 1,
            }
        }
        report
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Run the pack command
///
/// # Returns
/// Exit code: 0 when every group was packed or skipped, 1 otherwise
pub fn run(options: &PackOptions) -> Result<ExitCode> {
    let (report, _) = execute(options)?;
    Ok(if report.is_success() {
        println!("{} All groups packed", "OK".green().bold());
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

/// Runs the pack phase over every included group.
pub fn execute(options: &PackOptions) -> Result<(PackReport, Vec<GroupPackOutcome>)> {
    let sprite_root = options.sprite_root.as_path();

    print_banner("Shipsheet Pack");
    println!("{} {}", "Sprite root:".blue().bold(), sprite_root.display());
    println!(
        "{} {}",
        "Compositor:".blue().bold(),
        format!("{:?}", options.compositor).to_lowercase()
    );
    match options.settings.cell_size {
        Some(size) => println!("{} {}px", "Cell size:".blue().bold(), size),
        None => println!("{} from first sprite", "Cell size:".blue().bold()),
    }
    println!("{} {}px", "Padding:".blue().bold(), options.settings.padding);
    println!();

    let catalog = settings::load_catalog(options.config.as_deref(), sprite_root)?;
    print_source("Catalog:", &catalog);

    let groups = discover_groups(sprite_root, &catalog.value).map_err(coded)?;
    println!("{} Found {} group(s)", "INFO".blue().bold(), groups.len());
    println!();

    let compositor = options
        .compositor
        .build(Duration::from_secs(options.montage_timeout_secs))?;
    let packer = Packer::new(
        compositor.as_ref(),
        sprite_root,
        &catalog.value,
        options.settings,
    );
    let outcomes = packer.pack_all(&groups, print_outcome);
    let report = PackReport::from_outcomes(&outcomes);
    print_summary(&report, &outcomes);
    Ok((report, outcomes))
}

fn print_outcome(outcome: &GroupPackOutcome) {
    match outcome.status {
        PackStatus::Packed => {
            let shape = outcome
                .plan
                .map(|p| format!("{}x{}", p.columns, p.rows))
                .unwrap_or_default();
            println!(
                "{} {} ({} sprites, {}) -> {}",
                "OK".green().bold(),
                outcome.group,
                outcome.sprite_count,
                shape,
                outcome.sheet_path.display()
            );
        }
        PackStatus::SkippedEmpty => {
            println!(
                "{} {} (no sprites, nothing packed)",
                "SKIP".yellow().bold(),
                outcome.group
            );
        }
        PackStatus::Failed => {
            println!(
                "{} {} - {}",
                "FAIL".red().bold(),
                outcome.group,
                outcome.detail.as_deref().unwrap_or("unknown error")
            );
        }
    }
}

fn print_summary(report: &PackReport, outcomes: &[GroupPackOutcome]) {
    println!();
    print_banner("Pack Summary");
    println!("{} {}", "Packed:".green().bold(), report.packed);
    println!("{} {}", "Skipped (empty):".yellow().bold(), report.skipped);
    println!("{} {}", "Failed:".red().bold(), report.failed);
    println!();

    if report.failed > 0 {
        println!("{}", "Failed groups:".red().bold());
        for outcome in outcomes.iter().filter(|o| o.status == PackStatus::Failed) {
            println!(
                "  - {}: {}",
                outcome.group,
                outcome.detail.as_deref().unwrap_or("unknown error")
            );
        }
        println!();
    }
}
