//! Sheet metadata records.
//!
//! One metadata file is written next to each sheet image. It is always
//! regenerated in full from the group and its grid plan, and serializes
//! without timestamps so that re-packing unchanged inputs produces
//! byte-identical files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::error::StageError;
use crate::grid::GridPlan;
use crate::group::SpriteGroup;

/// Placement of one sprite inside a sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteRecord {
    /// Display name (file stem of the sprite).
    pub name: String,
    /// Subgroup of the sprite, empty when it sits directly in the group.
    pub subgroup: String,
    /// Left edge of the cell in pixels.
    pub x: u32,
    /// Top edge of the cell in pixels.
    pub y: u32,
    /// Zero-based position in packing order.
    pub index: u32,
}

/// Metadata describing one packed sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetMetadata {
    /// Group this sheet was packed from.
    pub group: String,
    /// Square cell size in pixels.
    pub cell_size: u32,
    /// Gap between cells in pixels.
    pub padding: u32,
    /// Grid columns.
    pub columns: u32,
    /// Grid rows.
    pub rows: u32,
    /// Sheet width in pixels.
    pub sheet_width: u32,
    /// Sheet height in pixels.
    pub sheet_height: u32,
    /// Sprites in packing order.
    pub sprites: Vec<SpriteRecord>,
}

impl SheetMetadata {
    /// Builds the metadata for `group` laid out on `plan`.
    pub fn from_group(group: &SpriteGroup, plan: &GridPlan) -> Self {
        let sprites = group
            .members()
            .iter()
            .enumerate()
            .map(|(index, member)| {
                let (x, y) = plan.cell_origin(index);
                SpriteRecord {
                    name: member.name.clone(),
                    subgroup: member.subgroup.clone(),
                    x,
                    y,
                    index: index as u32,
                }
            })
            .collect();

        Self {
            group: group.group().to_string(),
            cell_size: plan.cell_size,
            padding: plan.padding,
            columns: plan.columns,
            rows: plan.rows,
            sheet_width: plan.sheet_width(),
            sheet_height: plan.sheet_height(),
            sprites,
        }
    }

    /// Parses metadata from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes to pretty JSON with a trailing newline.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Writes the metadata to `path`, replacing any existing file.
    pub fn write(&self, path: &Path) -> Result<(), MetadataWriteError> {
        let json = self.to_json_pretty().map_err(MetadataWriteError::Serialize)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| MetadataWriteError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, json).map_err(|source| MetadataWriteError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Errors writing a metadata file. Fatal to the affected group only.
#[derive(Debug, Error)]
pub enum MetadataWriteError {
    /// Metadata could not be serialized.
    #[error("Failed to serialize sheet metadata: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Metadata could not be written.
    #[error("Failed to write sheet metadata to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StageError for MetadataWriteError {
    fn code(&self) -> &'static str {
        match self {
            MetadataWriteError::Serialize(_) => "METADATA_001",
            MetadataWriteError::Io { .. } => "METADATA_002",
        }
    }

    fn category(&self) -> &'static str {
        "metadata"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::SpriteMember;
    use pretty_assertions::assert_eq;

    fn group_of(names: &[&str]) -> SpriteGroup {
        let members = names
            .iter()
            .map(|n| {
                SpriteMember::from_relative(Path::new("/s/amarr"), Path::new(n)).unwrap()
            })
            .collect();
        SpriteGroup::new("amarr", members)
    }

    #[test]
    fn test_four_sprite_offsets() {
        let group = group_of(&[
            "frigate/d.png",
            "frigate/a.png",
            "frigate/c.png",
            "frigate/b.png",
        ]);
        let plan = GridPlan::plan(group.len(), 512, 0).unwrap();
        let meta = SheetMetadata::from_group(&group, &plan);

        let placed: Vec<_> = meta
            .sprites
            .iter()
            .map(|s| (s.name.as_str(), s.x, s.y, s.index))
            .collect();
        assert_eq!(
            placed,
            vec![
                ("a", 0, 0, 0),
                ("b", 512, 0, 1),
                ("c", 0, 512, 2),
                ("d", 512, 512, 3),
            ]
        );
        assert_eq!((meta.sheet_width, meta.sheet_height), (1024, 1024));
    }

    #[test]
    fn test_offsets_follow_index_for_many_sizes() {
        for n in 1..=40usize {
            let names: Vec<String> = (0..n).map(|i| format!("c/{i:03}.png")).collect();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let group = group_of(&refs);
            let plan = GridPlan::plan(n, 128, 0).unwrap();
            let meta = SheetMetadata::from_group(&group, &plan);

            assert_eq!(meta.sprites.len(), n);
            for (position, sprite) in meta.sprites.iter().enumerate() {
                assert_eq!(sprite.index as usize, position);
                assert_eq!(sprite.x, (sprite.index % meta.columns) * meta.cell_size);
                assert_eq!(sprite.y, (sprite.index / meta.columns) * meta.cell_size);
                assert_eq!(sprite.name, format!("{position:03}"));
            }
        }
    }

    #[test]
    fn test_write_overwrites_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheets").join("amarr.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "stale contents that are much longer than needed").unwrap();

        let group = group_of(&["frigate/punisher.png"]);
        let plan = GridPlan::plan(1, 512, 0).unwrap();
        let meta = SheetMetadata::from_group(&group, &plan);
        meta.write(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.ends_with('\n'));
        assert_eq!(SheetMetadata::from_json(&written).unwrap(), meta);
    }

    #[test]
    fn test_serialization_is_stable() {
        let group = group_of(&["b.png", "a.png"]);
        let plan = GridPlan::plan(2, 64, 0).unwrap();
        let first = SheetMetadata::from_group(&group, &plan)
            .to_json_pretty()
            .unwrap();
        let second = SheetMetadata::from_group(&group, &plan)
            .to_json_pretty()
            .unwrap();
        assert_eq!(first, second);
        assert!(first.find("\"group\"").unwrap() < first.find("\"sprites\"").unwrap());
    }
}
