//! Pack phase.
//!
//! For every group: re-scan its sprites, plan the grid, composite the sheet
//! and only then write the metadata. Both files land in the sheets directory
//! under the sprite root as `<group>.png` and `<group>.json`. A failure is
//! confined to its group.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::unbounded;
use serde::Serialize;
use shipsheet_core::{
    CatalogConfig, CompositeError, CompositeRequest, Compositor, GridPlan, MetadataWriteError,
    SheetMetadata, SpriteGroup, StageError,
};
use shipsheet_backend_sheet::read_dimensions;
use thiserror::Error;

use crate::grouping::{scan_group, GroupingError};

/// Per-run pack settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackSettings {
    /// Fixed cell size. `None` uses the size of the first sprite.
    pub cell_size: Option<u32>,
    /// Gap between cells in pixels.
    pub padding: u32,
    /// Number of groups packed concurrently.
    pub jobs: usize,
}

impl Default for PackSettings {
    fn default() -> Self {
        Self {
            cell_size: None,
            padding: 0,
            jobs: 1,
        }
    }
}

/// Errors packing one group.
#[derive(Debug, Error)]
pub enum PackError {
    #[error(transparent)]
    Grouping(#[from] GroupingError),

    /// The first sprite is not square, so no cell size can be derived.
    #[error("{path} is {width}x{height}; sprites must be square")]
    NonSquareSprite {
        path: PathBuf,
        width: u32,
        height: u32,
    },

    #[error(transparent)]
    Composite(#[from] CompositeError),

    #[error(transparent)]
    Metadata(#[from] MetadataWriteError),
}

impl StageError for PackError {
    fn code(&self) -> &'static str {
        match self {
            PackError::Grouping(e) => e.code(),
            PackError::NonSquareSprite { .. } => "PACK_001",
            PackError::Composite(e) => e.code(),
            PackError::Metadata(e) => e.code(),
        }
    }

    fn category(&self) -> &'static str {
        match self {
            PackError::Grouping(e) => e.category(),
            PackError::NonSquareSprite { .. } => "pack",
            PackError::Composite(e) => e.category(),
            PackError::Metadata(e) => e.category(),
        }
    }
}

/// What happened to one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PackStatus {
    Packed,
    SkippedEmpty,
    Failed,
}

/// Result of packing one group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupPackOutcome {
    pub group: String,
    pub status: PackStatus,
    pub sprite_count: usize,
    pub sheet_path: PathBuf,
    pub metadata_path: PathBuf,
    /// Grid shape for packed groups.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<GridPlan>,
    /// `[CODE] message` for failed groups.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Packs groups found under a sprite root.
pub struct Packer<'a> {
    compositor: &'a dyn Compositor,
    sprite_root: &'a Path,
    catalog: &'a CatalogConfig,
    settings: PackSettings,
}

impl<'a> Packer<'a> {
    pub fn new(
        compositor: &'a dyn Compositor,
        sprite_root: &'a Path,
        catalog: &'a CatalogConfig,
        settings: PackSettings,
    ) -> Self {
        Self {
            compositor,
            sprite_root,
            catalog,
            settings,
        }
    }

    /// Directory receiving sheets and metadata.
    pub fn sheets_dir(&self) -> PathBuf {
        self.sprite_root.join(&self.catalog.sheets_dir)
    }

    /// Sheet image and metadata paths for `group`.
    pub fn output_paths(&self, group: &str) -> (PathBuf, PathBuf) {
        let dir = self.sheets_dir();
        (
            dir.join(format!("{}.png", group)),
            dir.join(format!("{}.json", group)),
        )
    }

    /// Packs every group, handing each outcome to `on_outcome` as soon as it
    /// is produced. Returned outcomes are in `groups` order.
    pub fn pack_all<F>(&self, groups: &[String], mut on_outcome: F) -> Vec<GroupPackOutcome>
    where
        F: FnMut(&GroupPackOutcome),
    {
        let workers = self.settings.jobs.max(1).min(groups.len().max(1));
        let next = AtomicUsize::new(0);
        let (tx, rx) = unbounded::<(usize, GroupPackOutcome)>();
        let mut results = Vec::with_capacity(groups.len());

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let next = &next;
                scope.spawn(move || loop {
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    let Some(group) = groups.get(index) else {
                        break;
                    };
                    if tx.send((index, self.pack_group(group))).is_err() {
                        break;
                    }
                });
            }
            drop(tx);

            for (index, outcome) in rx.iter() {
                on_outcome(&outcome);
                results.push((index, outcome));
            }
        });

        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, outcome)| outcome).collect()
    }

    /// Packs one group. Never panics on bad input; errors become a
    /// [`PackStatus::Failed`] outcome.
    pub fn pack_group(&self, group: &str) -> GroupPackOutcome {
        let (sheet_path, metadata_path) = self.output_paths(group);
        let mut outcome = GroupPackOutcome {
            group: group.to_string(),
            status: PackStatus::Failed,
            sprite_count: 0,
            sheet_path,
            metadata_path,
            plan: None,
            detail: None,
        };

        let sprites = match scan_group(self.sprite_root, group, self.catalog) {
            Ok(sprites) => sprites,
            Err(e) => {
                outcome.detail = Some(describe(&PackError::from(e)));
                return outcome;
            }
        };
        outcome.sprite_count = sprites.len();
        if sprites.is_empty() {
            outcome.status = PackStatus::SkippedEmpty;
            return outcome;
        }

        match self.pack_sprites(&sprites, &outcome.sheet_path, &outcome.metadata_path) {
            Ok(plan) => {
                outcome.status = PackStatus::Packed;
                outcome.plan = Some(plan);
            }
            Err(e) => outcome.detail = Some(describe(&e)),
        }
        outcome
    }

    /// Composites the sheet, then writes its metadata. Metadata is never
    /// written unless a sheet of the planned size is on disk.
    pub fn pack_sprites(
        &self,
        sprites: &SpriteGroup,
        sheet_path: &Path,
        metadata_path: &Path,
    ) -> Result<GridPlan, PackError> {
        let cell_size = match self.settings.cell_size {
            Some(size) => size,
            None => derive_cell_size(sprites)?,
        };
        let plan = GridPlan::plan(sprites.len(), cell_size, self.settings.padding)
            .ok_or(CompositeError::NoImages)?;

        let images = sprites.image_paths();
        self.compositor.compose(&CompositeRequest {
            images: &images,
            plan: &plan,
            output_path: sheet_path,
        })?;
        verify_sheet(sheet_path, &plan)?;

        SheetMetadata::from_group(sprites, &plan).write(metadata_path)?;
        Ok(plan)
    }
}

/// Cell size from the first sprite in packing order.
fn derive_cell_size(sprites: &SpriteGroup) -> Result<u32, PackError> {
    let first = sprites.members().first().ok_or(CompositeError::NoImages)?;
    let (width, height) = read_dimensions(&first.image_path)?;
    if width != height {
        return Err(PackError::NonSquareSprite {
            path: first.image_path.clone(),
            width,
            height,
        });
    }
    Ok(width)
}

/// Checks the compositor left a sheet matching `plan` at `sheet_path`.
fn verify_sheet(sheet_path: &Path, plan: &GridPlan) -> Result<(), CompositeError> {
    let written = std::fs::metadata(sheet_path).is_ok_and(|m| m.is_file() && m.len() > 0);
    if !written {
        return Err(CompositeError::MissingOutput {
            path: sheet_path.to_path_buf(),
        });
    }
    let (width, height) = read_dimensions(sheet_path)?;
    if (width, height) != (plan.sheet_width(), plan.sheet_height()) {
        return Err(CompositeError::SheetSizeMismatch {
            path: sheet_path.to_path_buf(),
            width,
            height,
            expected_width: plan.sheet_width(),
            expected_height: plan.sheet_height(),
        });
    }
    Ok(())
}

fn describe<E: StageError>(err: &E) -> String {
    format!("[{}] {}", err.code(), err.message())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use pretty_assertions::assert_eq;
    use shipsheet_backend_sheet::RasterCompositor;

    fn sprite(root: &Path, relative: &str, size: u32) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbaImage::from_pixel(size, size, Rgba([200, 10, 10, 255]))
            .save(&path)
            .unwrap();
    }

    /// Fails every request whose output name starts with `bad`.
    struct PickyCompositor;

    impl Compositor for PickyCompositor {
        fn name(&self) -> &'static str {
            "picky"
        }

        fn compose(&self, request: &CompositeRequest<'_>) -> Result<(), CompositeError> {
            let name = request.output_path.file_name().unwrap().to_string_lossy();
            if name.starts_with("bad") {
                return Err(CompositeError::ProcessFailed {
                    exit_code: 1,
                    stderr: "boom".into(),
                });
            }
            RasterCompositor::new().compose(request)
        }
    }

    #[test]
    fn test_pack_group_writes_sheet_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for name in ["frigate/a.png", "frigate/b.png", "cruiser/c.png", "d.png", "e.png"] {
            sprite(root, &format!("amarr/{}", name), 8);
        }

        let catalog = CatalogConfig::default();
        let compositor = RasterCompositor::new();
        let packer = Packer::new(&compositor, root, &catalog, PackSettings::default());
        let outcome = packer.pack_group("amarr");

        assert_eq!(outcome.status, PackStatus::Packed);
        assert_eq!(outcome.sprite_count, 5);
        let plan = outcome.plan.unwrap();
        assert_eq!((plan.columns, plan.rows), (3, 2));
        assert_eq!(outcome.sheet_path, root.join("sheets/amarr.png"));
        assert_eq!(read_dimensions(&outcome.sheet_path).unwrap(), (24, 16));

        let json = std::fs::read_to_string(&outcome.metadata_path).unwrap();
        let metadata = SheetMetadata::from_json(&json).unwrap();
        let placed: Vec<(&str, u32, u32)> = metadata
            .sprites
            .iter()
            .map(|s| (s.name.as_str(), s.x, s.y))
            .collect();
        assert_eq!(
            placed,
            vec![
                ("d", 0, 0),
                ("e", 8, 0),
                ("c", 16, 0),
                ("a", 0, 8),
                ("b", 8, 8),
            ]
        );
    }

    #[test]
    fn test_empty_group_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("caldari/frigate")).unwrap();

        let catalog = CatalogConfig::default();
        let compositor = RasterCompositor::new();
        let packer = Packer::new(&compositor, dir.path(), &catalog, PackSettings::default());
        let outcome = packer.pack_group("caldari");

        assert_eq!(outcome.status, PackStatus::SkippedEmpty);
        assert!(!outcome.sheet_path.exists());
        assert!(!outcome.metadata_path.exists());
    }

    #[test]
    fn test_composite_failure_is_confined_to_group() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        sprite(root, "bad/x.png", 4);
        sprite(root, "good/y.png", 4);

        let catalog = CatalogConfig::default();
        let settings = PackSettings {
            jobs: 2,
            ..PackSettings::default()
        };
        let packer = Packer::new(&PickyCompositor, root, &catalog, settings);
        let mut seen = 0;
        let outcomes = packer.pack_all(&["bad".to_string(), "good".to_string()], |_| seen += 1);

        assert_eq!(seen, 2);
        assert_eq!(outcomes[0].group, "bad");
        assert_eq!(outcomes[0].status, PackStatus::Failed);
        assert!(outcomes[0].detail.as_deref().unwrap().starts_with("[SHEET_008]"));
        assert!(!outcomes[0].metadata_path.exists());

        assert_eq!(outcomes[1].status, PackStatus::Packed);
        assert!(outcomes[1].metadata_path.exists());
    }

    #[test]
    fn test_explicit_cell_size_mismatch_fails_group() {
        let dir = tempfile::tempdir().unwrap();
        sprite(dir.path(), "amarr/a.png", 8);

        let catalog = CatalogConfig::default();
        let compositor = RasterCompositor::new();
        let settings = PackSettings {
            cell_size: Some(16),
            ..PackSettings::default()
        };
        let packer = Packer::new(&compositor, dir.path(), &catalog, settings);
        let outcome = packer.pack_group("amarr");
        assert_eq!(outcome.status, PackStatus::Failed);
        assert!(outcome.detail.unwrap().starts_with("[SHEET_003]"));
    }

    #[test]
    fn test_non_square_first_sprite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("amarr/a.png");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbaImage::new(8, 4).save(&path).unwrap();

        let catalog = CatalogConfig::default();
        let compositor = RasterCompositor::new();
        let packer = Packer::new(&compositor, dir.path(), &catalog, PackSettings::default());
        let outcome = packer.pack_group("amarr");
        assert_eq!(outcome.status, PackStatus::Failed);
        assert!(outcome.detail.unwrap().starts_with("[PACK_001]"));
    }

    /// Reports success without writing, or writes a fixed 1x1 sheet.
    struct SloppyCompositor {
        writes: bool,
    }

    impl Compositor for SloppyCompositor {
        fn name(&self) -> &'static str {
            "sloppy"
        }

        fn compose(&self, request: &CompositeRequest<'_>) -> Result<(), CompositeError> {
            if self.writes {
                std::fs::create_dir_all(request.output_path.parent().unwrap()).unwrap();
                RgbaImage::new(1, 1).save(request.output_path).unwrap();
            }
            Ok(())
        }
    }

    #[test]
    fn test_compositor_writing_nothing_gets_no_metadata() {
        let dir = tempfile::tempdir().unwrap();
        sprite(dir.path(), "amarr/a.png", 8);

        let catalog = CatalogConfig::default();
        let compositor = SloppyCompositor { writes: false };
        let packer = Packer::new(&compositor, dir.path(), &catalog, PackSettings::default());
        let outcome = packer.pack_group("amarr");
        assert_eq!(outcome.status, PackStatus::Failed);
        assert!(outcome.detail.unwrap().starts_with("[SHEET_010]"));
        assert!(!outcome.metadata_path.exists());
    }

    #[test]
    fn test_sheet_of_wrong_size_gets_no_metadata() {
        let dir = tempfile::tempdir().unwrap();
        sprite(dir.path(), "amarr/a.png", 8);
        sprite(dir.path(), "amarr/b.png", 8);

        let catalog = CatalogConfig::default();
        let compositor = SloppyCompositor { writes: true };
        let packer = Packer::new(&compositor, dir.path(), &catalog, PackSettings::default());
        let outcome = packer.pack_group("amarr");
        assert_eq!(outcome.status, PackStatus::Failed);
        assert!(outcome.detail.unwrap().starts_with("[SHEET_012]"));
        assert!(!outcome.metadata_path.exists());
    }

    #[test]
    fn test_repack_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for name in ["a.png", "b.png", "c.png"] {
            sprite(root, &format!("gallente/{}", name), 6);
        }

        let catalog = CatalogConfig::default();
        let compositor = RasterCompositor::new();
        let packer = Packer::new(&compositor, root, &catalog, PackSettings::default());

        let first = packer.pack_group("gallente");
        let sheet = std::fs::read(&first.sheet_path).unwrap();
        let metadata = std::fs::read(&first.metadata_path).unwrap();

        let second = packer.pack_group("gallente");
        assert_eq!(std::fs::read(&second.sheet_path).unwrap(), sheet);
        assert_eq!(std::fs::read(&second.metadata_path).unwrap(), metadata);
    }
}
