//! Build command implementation
//!
//! Render phase followed by the pack phase over the render output. The pack
//! phase still runs after render failures, since every group is packed from
//! whatever sprites exist on disk. An interrupted render skips packing.

use anyhow::Result;
use colored::Colorize;
use shipsheet_core::CancelToken;
use std::process::ExitCode;

use super::pack::{self, PackOptions};
use super::render::{self, EngineOptions, RenderOptions};
use crate::cancel::install_ctrl_c;
use crate::settings::{locate, CATALOG_FILE};

/// Run the build command
///
/// # Returns
/// Exit code: 0 when both phases succeeded, 1 when either had failures
pub fn run(render: &RenderOptions, engine: &EngineOptions, pack: &PackOptions) -> Result<ExitCode> {
    let cancel = CancelToken::new();
    install_ctrl_c(cancel.clone())?;

    let report = render::execute(render, || engine.build(), cancel)?;
    if report.cancelled {
        println!(
            "{} Render interrupted; skipping pack phase",
            "WARN".yellow().bold()
        );
        return Ok(ExitCode::from(1));
    }
    println!();

    let (pack_report, _) = pack::execute(&pack_options(render, pack))?;

    if report.is_success() && pack_report.is_success() {
        println!("{} Build complete", "OK".green().bold());
        Ok(ExitCode::SUCCESS)
    } else {
        println!(
            "{} Build finished with failures (render: {}, pack: {})",
            "FAIL".red().bold(),
            report.counters.failed() + report.not_attempted,
            pack_report.failed
        );
        Ok(ExitCode::from(1))
    }
}

/// Pack options for the render output. The catalog defaults to the one in
/// the models root, so both phases see the same groups.
pub fn pack_options(render: &RenderOptions, pack: &PackOptions) -> PackOptions {
    let config = pack
        .config
        .clone()
        .or_else(|| render.config.clone())
        .or_else(|| locate(None, &render.models_root, CATALOG_FILE));
    PackOptions {
        sprite_root: render.out_root.clone(),
        config,
        ..pack.clone()
    }
}
