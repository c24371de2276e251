//! Visual audit contact sheets.
//!
//! A contact sheet shows every sprite of a group as a labelled thumbnail on
//! a dark background, for eyeballing orientation and framing problems. The
//! master sheet stacks all groups into one image. Unlike packed sheets these
//! are for people: thumbnails are scaled down, and a sprite that fails to
//! decode becomes a red placeholder instead of failing the sheet.

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use shipsheet_core::{SpriteGroup, SpriteMember, StageError};
use thiserror::Error;

use crate::font::{draw_text, ellipsize, ADVANCE, GLYPH_HEIGHT};
use crate::png::{write_rgba, PngConfig, PngError};

/// Default thumbnail size of per-group sheets.
pub const DEFAULT_THUMB_SIZE: u32 = 128;
/// Default column count of per-group sheets.
pub const DEFAULT_COLUMNS: u32 = 8;
/// File name of the master sheet.
pub const MASTER_SHEET_FILE: &str = "ALL_SPRITES_audit.png";

const MARGIN: u32 = 10;
const TITLE_SCALE: u32 = 2;
const ERROR_RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

const ACCENTS: [[u8; 3]; 13] = [
    [255, 215, 0],
    [100, 149, 237],
    [50, 205, 50],
    [205, 92, 92],
    [148, 0, 211],
    [255, 69, 0],
    [255, 165, 0],
    [70, 130, 180],
    [128, 128, 128],
    [139, 69, 19],
    [186, 85, 211],
    [255, 20, 147],
    [0, 191, 255],
];

/// Header colour of the `index`-th group in name order.
pub fn accent_for(index: usize) -> Rgba<u8> {
    let [r, g, b] = ACCENTS[index % ACCENTS.len()];
    Rgba([r, g, b, 255])
}

/// Audit sheet file name for `group`.
pub fn group_sheet_file(group: &str) -> String {
    format!("{}_audit.png", group)
}

/// Geometry and colours of a contact sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditLayout {
    pub thumb_size: u32,
    pub columns: u32,
    pub label_height: u32,
    pub header_height: u32,
    /// Longest ship name before it is shortened with `..`.
    pub name_chars: usize,
    /// Longest label, subgroup prefix included.
    pub label_chars: usize,
    /// Prefix labels with the first letters of the subgroup.
    pub show_subgroup: bool,
    pub background: Rgba<u8>,
    pub header: Rgba<u8>,
    pub label: Rgba<u8>,
}

impl AuditLayout {
    /// Layout of a per-group sheet.
    pub fn group(thumb_size: u32, columns: u32) -> Self {
        Self {
            thumb_size: thumb_size.max(8),
            columns: columns.max(1),
            label_height: 20,
            header_height: 40,
            name_chars: 14,
            label_chars: 16,
            show_subgroup: true,
            background: Rgba([30, 30, 35, 255]),
            header: Rgba([40, 40, 45, 255]),
            label: Rgba([180, 180, 180, 255]),
        }
    }

    /// Layout of the master sheet.
    pub fn master() -> Self {
        Self {
            thumb_size: 96,
            columns: 12,
            label_height: 16,
            header_height: 30,
            name_chars: 12,
            label_chars: 12,
            show_subgroup: false,
            background: Rgba([25, 25, 30, 255]),
            header: Rgba([35, 35, 40, 255]),
            label: Rgba([150, 150, 150, 255]),
        }
    }

    fn cell_height(&self) -> u32 {
        self.thumb_size + self.label_height
    }

    fn rows(&self, count: usize) -> u32 {
        (count as u32).div_ceil(self.columns)
    }

    fn width(&self) -> u32 {
        self.columns * self.thumb_size + 2 * MARGIN
    }

    /// Label text for one tile, shortened to fit both the layout limit and
    /// the tile width.
    pub fn label_for(&self, member: &SpriteMember) -> String {
        let mut label = ellipsize(&member.name, self.name_chars);
        if self.show_subgroup && !member.subgroup.is_empty() {
            let prefix: String = member.subgroup.chars().take(3).collect();
            label = ellipsize(&format!("{}/{}", prefix, label), self.label_chars);
        }
        let fits = (self.thumb_size.saturating_sub(4) / ADVANCE) as usize;
        ellipsize(&label, fits)
    }
}

/// A rendered contact sheet.
#[derive(Debug, Clone)]
pub struct AuditSheet {
    pub image: RgbaImage,
    pub sprite_count: usize,
    /// Sprites drawn as placeholders because they could not be decoded.
    pub unreadable: Vec<PathBuf>,
}

/// Errors writing audit sheets.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Failed to write audit sheet {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: PngError,
    },
}

impl StageError for AuditError {
    fn code(&self) -> &'static str {
        match self {
            AuditError::Write { .. } => "AUDIT_001",
        }
    }

    fn category(&self) -> &'static str {
        "audit"
    }
}

impl AuditSheet {
    /// Writes the sheet as PNG, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<(), AuditError> {
        write_rgba(&self.image, path, &PngConfig::default()).map_err(|source| AuditError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Draws the contact sheet of one group.
pub fn group_sheet(group: &SpriteGroup, layout: &AuditLayout, accent: Rgba<u8>) -> AuditSheet {
    let rows = layout.rows(group.len());
    let height = layout.header_height + rows * layout.cell_height() + 2 * MARGIN;
    let mut image = RgbaImage::from_pixel(layout.width(), height, layout.background);

    let title = format!("{} ({} ships)", group.group(), group.len());
    draw_header(&mut image, layout, 0, &title, accent);

    let mut unreadable = Vec::new();
    draw_tiles(
        &mut image,
        layout,
        group,
        layout.header_height + MARGIN,
        &mut unreadable,
    );

    AuditSheet {
        image,
        sprite_count: group.len(),
        unreadable,
    }
}

/// Draws every non-empty group into one sheet, one section per group in the
/// given order.
pub fn master_sheet(groups: &[SpriteGroup], layout: &AuditLayout) -> AuditSheet {
    let sections: Vec<(usize, &SpriteGroup)> = groups
        .iter()
        .enumerate()
        .filter(|(_, g)| !g.is_empty())
        .collect();

    let height = 2 * MARGIN
        + sections
            .iter()
            .map(|(_, g)| layout.header_height + layout.rows(g.len()) * layout.cell_height() + MARGIN)
            .sum::<u32>();
    let mut image = RgbaImage::from_pixel(layout.width(), height, layout.background);

    let mut unreadable = Vec::new();
    let mut y = MARGIN;
    for (index, group) in &sections {
        let title = format!("{} ({})", group.group(), group.len());
        draw_header(&mut image, layout, y, &title, accent_for(*index));
        y += layout.header_height;
        draw_tiles(&mut image, layout, group, y, &mut unreadable);
        y += layout.rows(group.len()) * layout.cell_height() + MARGIN;
    }

    AuditSheet {
        image,
        sprite_count: sections.iter().map(|(_, g)| g.len()).sum(),
        unreadable,
    }
}

fn draw_header(image: &mut RgbaImage, layout: &AuditLayout, top: u32, title: &str, accent: Rgba<u8>) {
    fill_rect(image, 0, top, image.width(), layout.header_height, layout.header);
    let text_y = top + layout.header_height.saturating_sub(GLYPH_HEIGHT * TITLE_SCALE) / 2;
    draw_text(image, MARGIN, text_y, &title.to_uppercase(), TITLE_SCALE, accent);
}

fn draw_tiles(
    image: &mut RgbaImage,
    layout: &AuditLayout,
    group: &SpriteGroup,
    top: u32,
    unreadable: &mut Vec<PathBuf>,
) {
    let thumb = layout.thumb_size;
    for (index, member) in group.members().iter().enumerate() {
        let index = index as u32;
        let x = MARGIN + (index % layout.columns) * thumb;
        let y = top + (index / layout.columns) * layout.cell_height();

        match load_thumbnail(&member.image_path, thumb.saturating_sub(4)) {
            Some(tile) => {
                let tx = x + (thumb - tile.width()) / 2;
                let ty = y + (thumb - tile.height()) / 2;
                imageops::overlay(image, &tile, i64::from(tx), i64::from(ty));
            }
            None => {
                outline_rect(image, x + 2, y + 2, thumb - 4, thumb - 4, ERROR_RED);
                draw_text(image, x + 10, y + thumb / 2, "ERROR", 1, ERROR_RED);
                unreadable.push(member.image_path.clone());
            }
        }

        let label = layout.label_for(member);
        draw_text(image, x + 4, y + thumb + 2, &label.to_uppercase(), 1, layout.label);
    }
}

/// Decodes a sprite and scales it down to fit a `fit` square, keeping its
/// aspect ratio. Smaller sprites are left at their size.
fn load_thumbnail(path: &Path, fit: u32) -> Option<RgbaImage> {
    let sprite = image::open(path).ok()?.to_rgba8();
    let (width, height) = sprite.dimensions();
    let fit = fit.max(1);
    if width <= fit && height <= fit {
        return Some(sprite);
    }
    let longest = width.max(height) as f64;
    let scale = fit as f64 / longest;
    let new_width = ((width as f64 * scale).round() as u32).clamp(1, fit);
    let new_height = ((height as f64 * scale).round() as u32).clamp(1, fit);
    Some(imageops::resize(&sprite, new_width, new_height, FilterType::Lanczos3))
}

fn fill_rect(image: &mut RgbaImage, x: u32, y: u32, width: u32, height: u32, color: Rgba<u8>) {
    for py in y..(y + height).min(image.height()) {
        for px in x..(x + width).min(image.width()) {
            image.put_pixel(px, py, color);
        }
    }
}

fn outline_rect(image: &mut RgbaImage, x: u32, y: u32, width: u32, height: u32, color: Rgba<u8>) {
    const LINE: u32 = 2;
    fill_rect(image, x, y, width, LINE, color);
    fill_rect(image, x, (y + height).saturating_sub(LINE), width, LINE, color);
    fill_rect(image, x, y, LINE, height, color);
    fill_rect(image, (x + width).saturating_sub(LINE), y, LINE, height, color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sprite(dir: &Path, relative: &str, width: u32, height: u32) -> SpriteMember {
        let path = dir.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbaImage::from_pixel(width, height, Rgba([0, 255, 0, 255]))
            .save(&path)
            .unwrap();
        SpriteMember::from_relative(dir, Path::new(relative)).unwrap()
    }

    fn member(relative: &str) -> SpriteMember {
        SpriteMember::from_relative(Path::new("/sprites/amarr"), Path::new(relative)).unwrap()
    }

    #[test]
    fn test_group_sheet_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let members = (0..10)
            .map(|i| sprite(dir.path(), &format!("frigate/s{}.png", i), 32, 32))
            .collect();
        let group = SpriteGroup::new("amarr", members);

        let layout = AuditLayout::group(64, 4);
        let sheet = group_sheet(&group, &layout, accent_for(0));

        // Three rows of (64 + 20), plus header and margins.
        assert_eq!(sheet.image.dimensions(), (4 * 64 + 20, 40 + 3 * 84 + 20));
        assert_eq!(sheet.sprite_count, 10);
        assert!(sheet.unreadable.is_empty());

        // First tile is centred in its cell; the background shows around it.
        let (cx, cy) = (10 + 32, 50 + 32);
        assert_eq!(sheet.image.get_pixel(cx, cy), &Rgba([0, 255, 0, 255]));
        assert_eq!(sheet.image.get_pixel(12, 52), &layout.background);
        assert_eq!(sheet.image.get_pixel(5, 2), &layout.header);
    }

    #[test]
    fn test_large_sprites_are_scaled_down() {
        let dir = tempfile::tempdir().unwrap();
        let group = SpriteGroup::new("caldari", vec![sprite(dir.path(), "big.png", 512, 256)]);
        let layout = AuditLayout::group(64, 2);
        let sheet = group_sheet(&group, &layout, accent_for(1));

        // 512x256 fits into 60x30, centred in the 64px cell.
        let (x, y) = (10, 50);
        assert!(sheet.image.get_pixel(x + 32, y + 32).0[1] > 200);
        assert_eq!(sheet.image.get_pixel(x + 32, y + 10), &layout.background);
    }

    #[test]
    fn test_unreadable_sprite_becomes_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.png");
        std::fs::write(&broken, b"not a png").unwrap();
        let members = vec![SpriteMember::from_relative(dir.path(), Path::new("broken.png")).unwrap()];
        let group = SpriteGroup::new("ore", members);

        let layout = AuditLayout::group(32, 1);
        let sheet = group_sheet(&group, &layout, accent_for(2));
        assert_eq!(sheet.unreadable, vec![broken]);
        assert_eq!(sheet.image.get_pixel(12, 52), &ERROR_RED);
    }

    #[test]
    fn test_master_sheet_skips_empty_groups() {
        let dir = tempfile::tempdir().unwrap();
        let groups = vec![
            SpriteGroup::new("amarr", vec![sprite(dir.path(), "a/x.png", 16, 16)]),
            SpriteGroup::new("jove", Vec::new()),
            SpriteGroup::new(
                "minmatar",
                (0..13)
                    .map(|i| sprite(dir.path(), &format!("m/s{}.png", i), 16, 16))
                    .collect(),
            ),
        ];

        let layout = AuditLayout::master();
        let sheet = master_sheet(&groups, &layout);
        assert_eq!(sheet.sprite_count, 14);
        // amarr: one row, minmatar: two rows of twelve columns.
        let section = |rows: u32| 30 + rows * (96 + 16) + 10;
        assert_eq!(
            sheet.image.dimensions(),
            (12 * 96 + 20, 20 + section(1) + section(2))
        );
    }

    #[test]
    fn test_labels() {
        let layout = AuditLayout::group(128, 8);
        assert_eq!(layout.label_for(&member("rifter.png")), "rifter");
        assert_eq!(layout.label_for(&member("frigate/rifter.png")), "fri/rifter");
        assert_eq!(
            layout.label_for(&member("battleship/apocalypse_navy_issue.png")),
            "bat/apocalypse.."
        );

        let master = AuditLayout::master();
        assert_eq!(
            master.label_for(&member("battleship/apocalypse_navy_issue.png")),
            "apocalypse.."
        );

        let narrow = AuditLayout::group(32, 8);
        assert_eq!(narrow.label_for(&member("rifter.png")), "ri..");
    }

    #[test]
    fn test_write_and_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let group = SpriteGroup::new("amarr", vec![sprite(dir.path(), "x.png", 8, 8)]);
        let sheet = group_sheet(&group, &AuditLayout::group(16, 2), accent_for(0));

        let path = dir.path().join("audit").join(group_sheet_file("amarr"));
        sheet.write(&path).unwrap();
        assert!(path.ends_with("audit/amarr_audit.png"));
        assert_eq!(
            image::image_dimensions(&path).unwrap(),
            sheet.image.dimensions()
        );
    }
}
