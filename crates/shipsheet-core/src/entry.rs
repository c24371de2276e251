//! Model entries discovered by the inventory scan.

use std::path::{Component, Path, PathBuf};

/// Extension of every rendered sprite.
pub const SPRITE_EXTENSION: &str = "png";

/// One renderable 3D model.
///
/// Derived from a path of the form `<root>/<group>/<subgroup...>/<name>.<ext>`.
/// The first directory is the group, any intermediate directories form the
/// subgroup (joined with `/`, possibly empty) and the file stem is the name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelEntry {
    /// Top-level category, e.g. a faction.
    pub group: String,
    /// Intermediate category, e.g. a ship class. Empty when the model sits
    /// directly inside its group directory.
    pub subgroup: String,
    /// File stem of the model.
    pub name: String,
    /// Path relative to the inventory root.
    pub relative_path: PathBuf,
    /// Absolute (or root-joined) path to the model file.
    pub source_path: PathBuf,
}

impl ModelEntry {
    /// Builds an entry from a path relative to `root`.
    ///
    /// Returns `None` when the path has no group directory, contains
    /// non-normal components (`..`, prefixes) or is not valid UTF-8.
    pub fn from_relative(root: &Path, relative: &Path) -> Option<Self> {
        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_str()?),
                Component::CurDir => {}
                _ => return None,
            }
        }

        if parts.len() < 2 {
            return None;
        }

        let group = parts[0].to_string();
        let subgroup = parts[1..parts.len() - 1].join("/");
        let name = Path::new(parts[parts.len() - 1])
            .file_stem()?
            .to_str()?
            .to_string();
        if name.is_empty() {
            return None;
        }

        let relative_path: PathBuf = parts.iter().collect();
        Some(Self {
            group,
            subgroup,
            name,
            source_path: root.join(&relative_path),
            relative_path,
        })
    }

    /// Stable identifier used to look up orientation overrides and sizes.
    ///
    /// `group/subgroup/name`, or `group/name` when there is no subgroup.
    pub fn key(&self) -> String {
        if self.subgroup.is_empty() {
            format!("{}/{}", self.group, self.name)
        } else {
            format!("{}/{}/{}", self.group, self.subgroup, self.name)
        }
    }

    /// Inventory order: group, subgroup, then name, so models directly in a
    /// group directory precede its subgroups. The relative path only breaks
    /// ties between files sharing a stem.
    pub fn order_key(&self) -> (&str, &str, &str, &Path) {
        (&self.group, &self.subgroup, &self.name, &self.relative_path)
    }

    /// Canonical sprite path for this entry under `out_root`.
    ///
    /// Mirrors the source layout with the extension swapped, so two models
    /// sharing a stem in one directory map to the same file. The inventory
    /// scan rejects such trees.
    pub fn output_path(&self, out_root: &Path) -> PathBuf {
        out_root
            .join(&self.relative_path)
            .with_extension(SPRITE_EXTENSION)
    }
}

impl std::fmt::Display for ModelEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key())
    }
}
