//! Shipsheet CLI - top-down ship sprites and sprite sheets
//!
//! This binary renders a tree of 3D ship models into sprites and packs the
//! sprites of each group into a sheet with JSON metadata.

mod cli_args;

use clap::Parser;
use std::process::ExitCode;

use cli_args::{Cli, Commands, ConfigArgs, EngineArgs, PackArgs, RenderArgs};
use shipsheet_cli::commands;
use shipsheet_cli::commands::audit::AuditOptions;
use shipsheet_cli::commands::doctor::DoctorOptions;
use shipsheet_cli::commands::pack::PackOptions;
use shipsheet_cli::commands::render::{EngineOptions, RenderOptions};
use shipsheet_cli::dispatch::RenderSettings;
use shipsheet_cli::pack::PackSettings;
use std::path::PathBuf;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Render {
            models,
            out,
            render,
            engine,
            config,
        } => commands::render::run(
            &render_options(models, out, &render, config),
            &engine_options(engine),
        ),
        Commands::Pack {
            sprites,
            config,
            jobs,
            pack,
        } => commands::pack::run(&pack_options(sprites, config, jobs, &pack)),
        Commands::Audit {
            sprites,
            out,
            config,
            size,
            cols,
            all,
        } => commands::audit::run(&AuditOptions {
            sprite_root: sprites,
            out_dir: out,
            config,
            thumb_size: size,
            columns: cols,
            master: all,
        }),
        Commands::Build {
            models,
            out,
            render,
            engine,
            config,
            pack,
        } => {
            let pack = pack_options(out.clone(), config.config.clone(), render.jobs, &pack);
            commands::build::run(
                &render_options(models, out, &render, config),
                &engine_options(engine),
                &pack,
            )
        }
        Commands::Inventory {
            models,
            out,
            config,
            json,
        } => {
            let out = out.unwrap_or_else(|| commands::inventory::default_out_root(&models));
            commands::inventory::run(&models, &out, config.as_deref(), json)
        }
        Commands::Doctor {
            models,
            blender,
            entrypoint,
            config,
        } => commands::doctor::run(&DoctorOptions {
            models_root: models,
            blender,
            entrypoint,
            config: config.config,
            orientations: config.orientations,
            sizes: config.sizes,
        }),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}

fn render_options(
    models: PathBuf,
    out: PathBuf,
    render: &RenderArgs,
    config: ConfigArgs,
) -> RenderOptions {
    RenderOptions {
        models_root: models,
        out_root: out,
        settings: RenderSettings {
            resolution: render.resolution,
            jobs: render.jobs as usize,
            force: render.force,
        },
        config: config.config,
        orientations: config.orientations,
        sizes: config.sizes,
        verbose: render.verbose,
    }
}

fn engine_options(engine: EngineArgs) -> EngineOptions {
    EngineOptions {
        blender: engine.blender,
        entrypoint: engine.entrypoint,
        timeout_secs: engine.timeout,
        program: engine.engine_program,
        args: engine.engine_args,
    }
}

fn pack_options(
    sprites: PathBuf,
    config: Option<PathBuf>,
    jobs: u32,
    pack: &PackArgs,
) -> PackOptions {
    PackOptions {
        sprite_root: sprites,
        config,
        compositor: pack.compositor,
        montage_timeout_secs: pack.montage_timeout,
        settings: PackSettings {
            cell_size: pack.cell_size,
            padding: pack.padding,
            jobs: jobs as usize,
        },
    }
}
