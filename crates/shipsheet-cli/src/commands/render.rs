//! Render command implementation
//!
//! Renders every inventoried model that has no usable sprite yet, then
//! prints a summary and writes `render_summary.json` into the output root.

use anyhow::{Context, Result};
use colored::Colorize;
use shipsheet_backend_blender::{BlenderEngine, CommandEngine, OrchestratorConfig};
use shipsheet_core::{CancelToken, RenderEngine};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use super::reporting::{coded, print_banner};
use crate::accountant::{print_summary, RunAccountant, RunReport, SUMMARY_FILE};
use crate::cancel::install_ctrl_c;
use crate::dispatch::{Dispatcher, RenderSettings};
use crate::inventory;
use crate::settings::{self, print_source};

/// Which engine renders the models.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Explicit Blender executable.
    pub blender: Option<PathBuf>,
    /// Blender driver script replacing the embedded one.
    pub entrypoint: Option<PathBuf>,
    /// Per-model time budget in seconds.
    pub timeout_secs: u64,
    /// External program used instead of Blender.
    pub program: Option<PathBuf>,
    /// Argument templates for `program`.
    pub args: Vec<String>,
}

impl EngineOptions {
    /// Builds the engine, resolving executables up front.
    pub fn build(&self) -> Result<Box<dyn RenderEngine>> {
        let timeout = Duration::from_secs(self.timeout_secs);
        if let Some(program) = &self.program {
            let engine = CommandEngine::new(program, self.args.clone())
                .map_err(coded)?
                .timeout(timeout);
            return Ok(Box::new(engine));
        }

        let mut config = OrchestratorConfig::default().timeout(timeout);
        if let Some(path) = &self.blender {
            config = config.blender_path(path);
        }
        if let Some(path) = &self.entrypoint {
            config = config.entrypoint_path(path);
        }
        let engine = BlenderEngine::new(config).map_err(coded)?;
        Ok(Box::new(engine))
    }
}

/// Inputs of one render run.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub models_root: PathBuf,
    pub out_root: PathBuf,
    pub settings: RenderSettings,
    pub config: Option<PathBuf>,
    pub orientations: Option<PathBuf>,
    pub sizes: Option<PathBuf>,
    pub verbose: bool,
}

/// Run the render command
///
/// # Returns
/// Exit code: 0 when every entry was rendered or skipped, 1 otherwise
pub fn run(options: &RenderOptions, engine: &EngineOptions) -> Result<ExitCode> {
    let cancel = CancelToken::new();
    install_ctrl_c(cancel.clone())?;

    let report = execute(options, || engine.build(), cancel)?;
    Ok(exit_code(&report))
}

/// Runs the render phase and writes the run report.
///
/// Configuration and inventory are validated before the engine is built,
/// so a bad setup fails without any render attempt.
pub fn execute<F>(options: &RenderOptions, make_engine: F, cancel: CancelToken) -> Result<RunReport>
where
    F: FnOnce() -> Result<Box<dyn RenderEngine>>,
{
    let start = Instant::now();
    let models_root = options.models_root.as_path();
    let out_root = options.out_root.as_path();

    print_banner("Shipsheet Render");
    println!("{} {}", "Models root:".blue().bold(), models_root.display());
    println!("{} {}", "Output root:".blue().bold(), out_root.display());
    println!(
        "{} {}px",
        "Resolution:".blue().bold(),
        options.settings.resolution
    );
    println!("{} {}", "Jobs:".blue().bold(), options.settings.jobs);
    if options.settings.force {
        println!("{} {}", "Force:".blue().bold(), "yes".yellow());
    }
    println!();

    let catalog = settings::load_catalog(options.config.as_deref(), models_root)?;
    let orientations =
        settings::load_orientations(options.orientations.as_deref(), models_root)?;
    let sizes = settings::load_sizes(options.sizes.as_deref(), models_root)?;
    print_source("Catalog:", &catalog);
    print_source("Orientations:", &orientations);
    print_source("Sizes:", &sizes);

    let entries = inventory::scan(models_root, &catalog.value).map_err(coded)?;
    println!(
        "{} Found {} model(s)",
        "INFO".blue().bold(),
        entries.len()
    );

    let engine = make_engine()?;
    println!("{} Engine: {}", "INFO".blue().bold(), engine.name());
    println!();

    std::fs::create_dir_all(out_root)
        .with_context(|| format!("Failed to create output root: {}", out_root.display()))?;

    let mut accountant = RunAccountant::new(engine.name(), entries.len(), options.verbose);
    let dispatcher = Dispatcher::new(
        engine.as_ref(),
        out_root,
        &orientations.value,
        &sizes.value,
        options.settings,
    )
    .with_cancel(cancel);
    let summary = dispatcher.run(&entries, |outcome| accountant.record(outcome));

    let report = accountant.finish(summary.not_attempted, summary.cancelled, start.elapsed());
    print_summary(&report);
    write_report(&report, out_root)?;
    Ok(report)
}

fn write_report(report: &RunReport, out_root: &Path) -> Result<()> {
    let path = out_root.join(SUMMARY_FILE);
    report.write(&path)?;
    println!("{} Report written to: {}", "INFO".blue().bold(), path.display());
    Ok(())
}

/// Exit status for a finished render run.
pub fn exit_code(report: &RunReport) -> ExitCode {
    if report.is_success() {
        println!("{} All models rendered or up to date", "OK".green().bold());
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_engine_is_preferred() {
        let options = EngineOptions {
            program: Some(PathBuf::from("/bin/true")),
            args: vec!["{output}".to_string()],
            timeout_secs: 5,
            ..EngineOptions::default()
        };
        let engine = options.build().unwrap();
        assert_eq!(engine.name(), "command");
    }

    #[test]
    fn test_missing_explicit_blender_fails_build() {
        let dir = tempfile::tempdir().unwrap();
        let options = EngineOptions {
            blender: Some(dir.path().join("no-blender")),
            timeout_secs: 5,
            ..EngineOptions::default()
        };
        let err = options.build().err().unwrap();
        assert!(err.to_string().starts_with("[BLENDER_006]"));
    }

    #[test]
    fn test_missing_models_root_is_fatal_before_engine() {
        let dir = tempfile::tempdir().unwrap();
        let options = RenderOptions {
            models_root: dir.path().join("models"),
            out_root: dir.path().join("sprites"),
            settings: RenderSettings::default(),
            config: None,
            orientations: None,
            sizes: None,
            verbose: false,
        };
        let err = execute(
            &options,
            || panic!("engine must not be built"),
            CancelToken::new(),
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("[INVENTORY_001]"));
        assert!(!dir.path().join("sprites").exists());
    }
}
