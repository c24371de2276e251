//! Test harness utilities for building model and sprite trees.

use std::path::{Path, PathBuf};
use std::process::Command;

use image::{Rgba, RgbaImage};
use shipsheet_cli::commands::pack::{CompositorKind, PackOptions};
use shipsheet_cli::commands::render::RenderOptions;
use shipsheet_cli::dispatch::RenderSettings;
use shipsheet_cli::pack::PackSettings;
use shipsheet_core::SheetMetadata;
use tempfile::TempDir;

/// A scratch workspace with `models/` and `sprites/` roots.
pub struct TestHarness {
    /// Working directory for test inputs and outputs.
    pub work_dir: TempDir,
}

impl TestHarness {
    /// Create a new test harness.
    pub fn new() -> Self {
        let work_dir = TempDir::new().expect("Failed to create work dir");
        std::fs::create_dir_all(work_dir.path().join("models")).expect("Failed to create models");
        Self { work_dir }
    }

    pub fn path(&self) -> &Path {
        self.work_dir.path()
    }

    pub fn models(&self) -> PathBuf {
        self.path().join("models")
    }

    pub fn sprites(&self) -> PathBuf {
        self.path().join("sprites")
    }

    /// Adds a placeholder model file under the models root.
    pub fn add_model(&self, relative: &str) -> PathBuf {
        let path = self.models().join(relative);
        std::fs::create_dir_all(path.parent().expect("model has a parent"))
            .expect("Failed to create model dir");
        std::fs::write(&path, b"solid placeholder\nendsolid placeholder\n")
            .expect("Failed to write model");
        path
    }

    /// Adds a solid square sprite under the sprite root.
    pub fn add_sprite(&self, relative: &str, size: u32, shade: u8) -> PathBuf {
        let path = self.sprites().join(relative);
        std::fs::create_dir_all(path.parent().expect("sprite has a parent"))
            .expect("Failed to create sprite dir");
        RgbaImage::from_pixel(size, size, Rgba([shade, shade, 255, 255]))
            .save(&path)
            .expect("Failed to write sprite");
        path
    }

    /// Canonical sprite path for a model path relative to the models root.
    pub fn sprite_for(&self, model_relative: &str) -> PathBuf {
        self.sprites()
            .join(model_relative)
            .with_extension("png")
    }

    pub fn render_options(&self, settings: RenderSettings) -> RenderOptions {
        RenderOptions {
            models_root: self.models(),
            out_root: self.sprites(),
            settings,
            config: None,
            orientations: None,
            sizes: None,
            verbose: false,
        }
    }

    pub fn pack_options(&self, settings: PackSettings) -> PackOptions {
        PackOptions {
            sprite_root: self.sprites(),
            config: None,
            compositor: CompositorKind::Raster,
            montage_timeout_secs: 120,
            settings,
        }
    }

    pub fn sheet_path(&self, group: &str) -> PathBuf {
        self.sprites().join("sheets").join(format!("{}.png", group))
    }

    pub fn metadata_path(&self, group: &str) -> PathBuf {
        self.sprites().join("sheets").join(format!("{}.json", group))
    }

    /// Reads and parses a group's metadata file.
    pub fn read_metadata(&self, group: &str) -> SheetMetadata {
        let json = std::fs::read_to_string(self.metadata_path(group))
            .expect("Failed to read metadata");
        SheetMetadata::from_json(&json).expect("Failed to parse metadata")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if Blender is available on the system.
pub fn is_blender_available() -> bool {
    Command::new("blender")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check if Blender tests should run based on environment variable.
pub fn should_run_blender_tests() -> bool {
    std::env::var("SHIPSHEET_RUN_BLENDER_TESTS")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
