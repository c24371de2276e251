//! In-process sheet compositing.
//!
//! Members are decoded, checked against the fixed cell size and copied onto
//! a transparent canvas at the same cell origins the metadata reports.

use std::path::Path;

use image::{imageops, Rgba, RgbaImage};
use shipsheet_core::{CompositeError, CompositeRequest, Compositor};

use crate::png::{write_rgba, PngConfig, PngError};

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Composites sheets with the `image` crate and a deterministic PNG encoder.
#[derive(Debug, Clone, Default)]
pub struct RasterCompositor {
    png: PngConfig,
}

impl RasterCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a custom PNG configuration.
    pub fn with_png_config(png: PngConfig) -> Self {
        Self { png }
    }

    /// Draws the sheet in memory without writing it.
    pub fn render_canvas(&self, request: &CompositeRequest<'_>) -> Result<RgbaImage, CompositeError> {
        request.check()?;
        let plan = request.plan;

        let mut canvas = RgbaImage::from_pixel(plan.sheet_width(), plan.sheet_height(), TRANSPARENT);
        for (index, path) in request.images.iter().enumerate() {
            let sprite = load_cell(path, plan.cell_size)?;
            let (x, y) = plan.cell_origin(index);
            imageops::replace(&mut canvas, &sprite, i64::from(x), i64::from(y));
        }

        Ok(canvas)
    }
}

impl Compositor for RasterCompositor {
    fn name(&self) -> &'static str {
        "raster"
    }

    fn compose(&self, request: &CompositeRequest<'_>) -> Result<(), CompositeError> {
        let canvas = self.render_canvas(request)?;
        write_rgba(&canvas, request.output_path, &self.png).map_err(|e| match e {
            PngError::Io(source) => CompositeError::io(request.output_path, source),
            PngError::Persist { source, .. } => CompositeError::io(request.output_path, source),
            PngError::Encoding(err) => CompositeError::Encode {
                message: err.to_string(),
            },
        })
    }
}

/// Decodes one member and checks it is exactly `cell_size` square.
fn load_cell(path: &Path, cell_size: u32) -> Result<RgbaImage, CompositeError> {
    let sprite = image::open(path)
        .map_err(|e| CompositeError::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
        .to_rgba8();

    let (width, height) = sprite.dimensions();
    if width != cell_size || height != cell_size {
        return Err(CompositeError::CellSizeMismatch {
            path: path.to_path_buf(),
            width,
            height,
            cell_size,
        });
    }
    Ok(sprite)
}

/// Reads the dimensions of an image without decoding its pixels.
pub fn read_dimensions(path: &Path) -> Result<(u32, u32), CompositeError> {
    image::image_dimensions(path).map_err(|e| CompositeError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
