//! Doctor command implementation
//!
//! Checks external tools and configuration files.

use anyhow::Result;
use colored::Colorize;
use shipsheet_backend_blender::orchestrator::resolve_entrypoint;
use shipsheet_backend_blender::find_blender;
use shipsheet_backend_sheet::MontageTool;
use shipsheet_core::StageError;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use crate::settings::{self, Loaded};

/// Inputs of the doctor command.
#[derive(Debug, Clone, Default)]
pub struct DoctorOptions {
    pub models_root: Option<PathBuf>,
    pub blender: Option<PathBuf>,
    pub entrypoint: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub orientations: Option<PathBuf>,
    pub sizes: Option<PathBuf>,
}

/// Run the doctor command
///
/// Checks:
/// - Blender installation and driver script
/// - ImageMagick (only needed by the montage compositor)
/// - Configuration files in the models root
///
/// # Returns
/// Exit code: 0 if all checks pass, 1 if any fail
pub fn run(options: &DoctorOptions) -> Result<ExitCode> {
    println!("{}", "Shipsheet Doctor".cyan().bold());
    println!("{}", "================".cyan());
    println!();

    let mut all_ok = true;

    println!("{}", "Versions:".bold());
    println!(
        "  {} shipsheet-cli v{}",
        "->".green(),
        env!("CARGO_PKG_VERSION")
    );
    println!();

    println!("{}", "Dependencies:".bold());
    match find_blender(options.blender.as_deref()) {
        Ok(path) => {
            let version = blender_version(&path).unwrap_or_else(|| "unknown".to_string());
            println!(
                "  {} Blender {} ({})",
                "ok".green(),
                version,
                path.display()
            );
        }
        Err(e) => {
            println!("  {} [{}] {}", "!!".red(), e.code(), e);
            println!(
                "     {}",
                "Blender renders the sprites; set --blender or BLENDER_PATH.".dimmed()
            );
            all_ok = false;
        }
    }

    match resolve_entrypoint(options.entrypoint.as_deref()) {
        Ok(entrypoint) if entrypoint.is_embedded() => {
            println!("  {} Blender driver script (embedded)", "ok".green());
        }
        Ok(entrypoint) => {
            println!(
                "  {} Blender driver script ({})",
                "ok".green(),
                entrypoint.path().display()
            );
        }
        Err(e) => {
            println!("  {} [{}] {}", "!!".red(), e.code(), e);
            all_ok = false;
        }
    }

    match MontageTool::locate() {
        Ok(tool) => {
            println!(
                "  {} ImageMagick montage ({})",
                "ok".green(),
                tool.program().display()
            );
        }
        Err(_) => {
            println!("  {} ImageMagick not found in PATH", "!!".yellow());
            println!(
                "     {}",
                "Only needed for --compositor montage.".dimmed()
            );
        }
    }
    println!();

    if let Some(root) = &options.models_root {
        println!("{}", "Configuration:".bold());
        if root.is_dir() {
            all_ok &= report(
                "Catalog",
                settings::load_catalog(options.config.as_deref(), root),
            );
            all_ok &= report(
                "Orientations",
                settings::load_orientations(options.orientations.as_deref(), root),
            );
            all_ok &= report("Sizes", settings::load_sizes(options.sizes.as_deref(), root));
        } else {
            println!(
                "  {} Models root is not a directory: {}",
                "!!".red(),
                root.display()
            );
            all_ok = false;
        }
        println!();
    }

    if all_ok {
        println!("{} All checks passed!", "SUCCESS".green().bold());
        Ok(ExitCode::SUCCESS)
    } else {
        println!(
            "{} Some checks failed. See above for details.",
            "WARNING".yellow().bold()
        );
        Ok(ExitCode::from(1))
    }
}

fn report<T>(label: &str, loaded: Result<Loaded<T>>) -> bool {
    match loaded {
        Ok(loaded) => {
            println!("  {} {}: {}", "ok".green(), label, loaded.origin());
            true
        }
        Err(e) => {
            println!("  {} {}: {:#}", "!!".red(), label, e);
            false
        }
    }
}

fn parse_blender_version(output: &str) -> Option<String> {
    output
        .lines()
        .next()
        .and_then(|line| line.strip_prefix("Blender "))
        .map(|v| v.trim().to_string())
}

/// Runs `blender --version`.
fn blender_version(path: &Path) -> Option<String> {
    let output = Command::new(path).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    parse_blender_version(&String::from_utf8_lossy(&output.stdout))
}
