//! Deterministic PNG writer.
//!
//! Uses fixed compression settings so the same canvas always encodes to the
//! same bytes, which keeps re-packed sheets byte-identical.

use std::io::Write;
use std::path::Path;

use image::RgbaImage;
use png::{BitDepth, ColorType, Compression, Encoder, FilterType};
use thiserror::Error;

/// Errors from PNG operations.
#[derive(Debug, Error)]
pub enum PngError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PNG encoding error: {0}")]
    Encoding(#[from] png::EncodingError),

    #[error("Failed to persist {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// PNG export configuration.
#[derive(Debug, Clone)]
pub struct PngConfig {
    /// Compression level. Fixed for determinism.
    pub compression: Compression,
    /// Filter type. Fixed for determinism.
    pub filter: FilterType,
}

impl Default for PngConfig {
    fn default() -> Self {
        Self {
            compression: Compression::Default,
            filter: FilterType::NoFilter,
        }
    }
}

impl PngConfig {
    /// Smaller files at the cost of encode time.
    pub fn best_compression() -> Self {
        Self {
            compression: Compression::Best,
            filter: FilterType::Paeth,
        }
    }
}

/// Encodes an RGBA canvas to any writer.
pub fn write_rgba_to_writer<W: Write>(
    canvas: &RgbaImage,
    writer: W,
    config: &PngConfig,
) -> Result<(), PngError> {
    let mut encoder = Encoder::new(writer, canvas.width(), canvas.height());
    encoder.set_color(ColorType::Rgba);
    encoder.set_depth(BitDepth::Eight);
    encoder.set_compression(config.compression);
    encoder.set_filter(config.filter);

    // No tIME chunk: the png crate never adds one unless asked.
    let mut png_writer = encoder.write_header()?;
    png_writer.write_image_data(canvas.as_raw())?;
    png_writer.finish()?;

    Ok(())
}

/// Encodes an RGBA canvas to memory.
pub fn write_rgba_to_vec(canvas: &RgbaImage, config: &PngConfig) -> Result<Vec<u8>, PngError> {
    let mut buf = Vec::new();
    write_rgba_to_writer(canvas, &mut buf, config)?;
    Ok(buf)
}

/// Writes an RGBA canvas to `path`.
///
/// The file is written next to its destination and renamed into place, so
/// `path` never holds a half-written sheet.
pub fn write_rgba(canvas: &RgbaImage, path: &Path, config: &PngConfig) -> Result<(), PngError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut file = tempfile::Builder::new()
        .prefix(".shipsheet-")
        .suffix(".png.tmp")
        .tempfile_in(parent)?;
    let bytes = write_rgba_to_vec(canvas, config)?;
    file.write_all(&bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| PngError::Persist {
        path: path.display().to_string(),
        source: e.error,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn canvas() -> RgbaImage {
        let mut img = RgbaImage::from_pixel(4, 3, Rgba([0, 0, 0, 0]));
        img.put_pixel(1, 2, Rgba([255, 128, 0, 255]));
        img
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let a = write_rgba_to_vec(&canvas(), &PngConfig::default()).unwrap();
        let b = write_rgba_to_vec(&canvas(), &PngConfig::default()).unwrap();
        assert_eq!(a, b);
        assert_eq!(&a[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_write_rgba_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sheet.png");
        write_rgba(&canvas(), &path, &PngConfig::best_compression()).unwrap();

        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (4, 3));
        assert_eq!(decoded.get_pixel(1, 2), &Rgba([255, 128, 0, 255]));

        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
