//! Ordered groups of rendered sprites.

use std::path::{Path, PathBuf};

/// One rendered sprite found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteMember {
    /// Display name (file stem).
    pub name: String,
    /// Subgroup directories between the group and the file, joined with `/`.
    pub subgroup: String,
    /// Path relative to the group directory.
    pub relative_path: PathBuf,
    /// Path to the image file.
    pub image_path: PathBuf,
}

impl SpriteMember {
    /// Builds a member from a path relative to its group directory.
    pub fn from_relative(group_dir: &Path, relative: &Path) -> Option<Self> {
        let name = relative.file_stem()?.to_str()?.to_string();
        let subgroup = relative
            .parent()
            .map(|parent| {
                parent
                    .components()
                    .filter_map(|c| c.as_os_str().to_str())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_default();

        Some(Self {
            name,
            subgroup,
            relative_path: relative.to_path_buf(),
            image_path: group_dir.join(relative),
        })
    }

    /// Packing order: subgroup, then name. Sprites directly in the group
    /// directory come first. The relative path only breaks ties between
    /// names differing in extension case.
    pub fn order_key(&self) -> (&str, &str, &Path) {
        (&self.subgroup, &self.name, &self.relative_path)
    }
}

/// The sprites of one group, in packing order.
///
/// Members are kept sorted by [`SpriteMember::order_key`]. The same order feeds both the
/// compositor and the metadata emitter, so sprite `i` in the metadata is
/// always the sprite drawn in cell `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteGroup {
    group: String,
    members: Vec<SpriteMember>,
}

impl SpriteGroup {
    /// Creates a group, sorting `members` into packing order.
    pub fn new(group: impl Into<String>, mut members: Vec<SpriteMember>) -> Self {
        members.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
        Self {
            group: group.into(),
            members,
        }
    }

    /// Group name.
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Members in packing order.
    pub fn members(&self) -> &[SpriteMember] {
        &self.members
    }

    /// Image paths in packing order.
    pub fn image_paths(&self) -> Vec<PathBuf> {
        self.members.iter().map(|m| m.image_path.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(relative: &str) -> SpriteMember {
        SpriteMember::from_relative(Path::new("/sprites/amarr"), Path::new(relative)).unwrap()
    }

    #[test]
    fn test_member_subgroup_and_name() {
        let m = member("frigate/punisher.png");
        assert_eq!(m.name, "punisher");
        assert_eq!(m.subgroup, "frigate");
        assert_eq!(
            m.image_path,
            PathBuf::from("/sprites/amarr/frigate/punisher.png")
        );

        let top = member("avatar.png");
        assert_eq!(top.subgroup, "");
    }

    #[test]
    fn test_members_sorted_by_subgroup_then_name() {
        let group = SpriteGroup::new(
            "amarr",
            vec![
                member("frigate/tormentor.png"),
                member("battleship/apocalypse.png"),
                member("frigate/punisher.png"),
                member("avatar.png"),
            ],
        );

        let names: Vec<_> = group.members().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["avatar", "apocalypse", "punisher", "tormentor"]);
    }

    #[test]
    fn test_top_level_sprites_precede_subgroups() {
        let group = SpriteGroup::new(
            "amarr",
            vec![
                member("alpha/x.png"),
                member("zeta.png"),
                member("a-b.png"),
                member("a.png"),
            ],
        );

        let order: Vec<(&str, &str)> = group
            .members()
            .iter()
            .map(|m| (m.subgroup.as_str(), m.name.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![("", "a"), ("", "a-b"), ("", "zeta"), ("alpha", "x")]
        );
    }

    #[test]
    fn test_order_is_independent_of_input_order() {
        let a = SpriteGroup::new("g", vec![member("b/x.png"), member("a/y.png")]);
        let b = SpriteGroup::new("g", vec![member("a/y.png"), member("b/x.png")]);
        assert_eq!(a, b);
    }
}
