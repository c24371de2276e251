//! CLI argument definitions for the shipsheet command-line interface.
//!
//! All `#[derive(Parser)]`, `#[derive(Args)]` and `#[derive(Subcommand)]`
//! types are defined here, keeping `main.rs` focused on dispatch logic.

use clap::{Args, Parser, Subcommand};
use shipsheet_backend_blender::DEFAULT_TIMEOUT_SECS;
use shipsheet_backend_sheet::audit::{DEFAULT_COLUMNS, DEFAULT_THUMB_SIZE};
use shipsheet_cli::commands::pack::CompositorKind;
use shipsheet_cli::dispatch::DEFAULT_RESOLUTION;
use std::path::PathBuf;

/// Shipsheet - top-down ship sprites and sprite sheets from 3D models
#[derive(Parser)]
#[command(name = "shipsheet")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Render every model without a usable sprite
    Render {
        /// Root of the model tree (<group>/<subgroup...>/<name>.stl)
        #[arg(short, long)]
        models: PathBuf,

        /// Root of the sprite tree
        #[arg(short, long)]
        out: PathBuf,

        #[command(flatten)]
        render: RenderArgs,

        #[command(flatten)]
        engine: EngineArgs,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Pack the sprites of each group into a sheet with metadata
    Pack {
        /// Root of the sprite tree
        #[arg(short, long)]
        sprites: PathBuf,

        /// Catalog configuration (default: <sprites>/shipsheet.json if present)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of groups packed concurrently
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        jobs: u32,

        #[command(flatten)]
        pack: PackArgs,
    },

    /// Draw labelled contact sheets of the sprites for visual review
    Audit {
        /// Root of the sprite tree
        #[arg(short, long)]
        sprites: PathBuf,

        /// Output directory (default: <sprites>/audit_sheets)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Catalog configuration (default: <sprites>/shipsheet.json if present)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Thumbnail size in pixels
        #[arg(long, default_value_t = DEFAULT_THUMB_SIZE, value_parser = clap::value_parser!(u32).range(8..))]
        size: u32,

        /// Thumbnails per row
        #[arg(long, default_value_t = DEFAULT_COLUMNS, value_parser = clap::value_parser!(u32).range(1..))]
        cols: u32,

        /// Also draw one master sheet covering every group
        #[arg(short, long)]
        all: bool,
    },

    /// Render, then pack the render output
    Build {
        /// Root of the model tree
        #[arg(short, long)]
        models: PathBuf,

        /// Root of the sprite tree
        #[arg(short, long)]
        out: PathBuf,

        #[command(flatten)]
        render: RenderArgs,

        #[command(flatten)]
        engine: EngineArgs,

        #[command(flatten)]
        config: ConfigArgs,

        #[command(flatten)]
        pack: PackArgs,
    },

    /// List inventoried models and whether they are already rendered
    Inventory {
        /// Root of the model tree
        #[arg(short, long)]
        models: PathBuf,

        /// Root of the sprite tree (default: sprites/ next to the models root)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Catalog configuration (default: <models>/shipsheet.json if present)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Check Blender, ImageMagick and configuration files
    Doctor {
        /// Root of the model tree whose configuration files are checked
        #[arg(short, long)]
        models: Option<PathBuf>,

        /// Blender executable
        #[arg(long)]
        blender: Option<PathBuf>,

        /// Blender driver script replacing the embedded one
        #[arg(long)]
        entrypoint: Option<PathBuf>,

        #[command(flatten)]
        config: ConfigArgs,
    },
}

/// Render phase options.
#[derive(Args, Debug, Clone)]
pub(crate) struct RenderArgs {
    /// Square output resolution in pixels
    #[arg(short, long, default_value_t = DEFAULT_RESOLUTION, value_parser = clap::value_parser!(u32).range(1..))]
    pub resolution: u32,

    /// Number of concurrent renders
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub jobs: u32,

    /// Re-render models whose sprite already exists
    #[arg(short, long)]
    pub force: bool,

    /// Show engine output for failures
    #[arg(short, long)]
    pub verbose: bool,
}

/// Rendering engine selection.
#[derive(Args, Debug, Clone)]
pub(crate) struct EngineArgs {
    /// Blender executable (default: BLENDER_PATH, PATH, common install locations)
    #[arg(long)]
    pub blender: Option<PathBuf>,

    /// Blender driver script replacing the embedded one
    #[arg(long)]
    pub entrypoint: Option<PathBuf>,

    /// Per-model render timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// External program to render with instead of Blender
    #[arg(long)]
    pub engine_program: Option<PathBuf>,

    /// Argument for --engine-program; may repeat. Supports {input}, {output},
    /// {resolution}, {fill_ratio}, {key} and {directive}
    #[arg(long = "engine-arg", allow_hyphen_values = true, requires = "engine_program")]
    pub engine_args: Vec<String>,
}

/// Configuration file locations.
#[derive(Args, Debug, Clone)]
pub(crate) struct ConfigArgs {
    /// Catalog configuration (default: <models>/shipsheet.json if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Orientation overrides (default: <models>/ship_orientations.json if present)
    #[arg(long)]
    pub orientations: Option<PathBuf>,

    /// Size table (default: <models>/ship_sizes.json if present)
    #[arg(long)]
    pub sizes: Option<PathBuf>,
}

/// Pack phase options.
#[derive(Args, Debug, Clone)]
pub(crate) struct PackArgs {
    /// Sheet compositor
    #[arg(long, value_enum, default_value_t = CompositorKind::Raster)]
    pub compositor: CompositorKind,

    /// Cell size in pixels (default: size of the first sprite)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub cell_size: Option<u32>,

    /// Gap between cells in pixels
    #[arg(long, default_value_t = 0)]
    pub padding: u32,

    /// Montage timeout in seconds
    #[arg(
        long,
        default_value_t = shipsheet_backend_sheet::montage::DEFAULT_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub montage_timeout: u64,
}
