//! Shipsheet Sheet Backend
//!
//! Compositors for the pack phase. Both implement
//! [`shipsheet_core::Compositor`] and lay members out row-major on the grid
//! described by a [`shipsheet_core::GridPlan`].
//!
//! - [`RasterCompositor`] decodes members with `image` and encodes the sheet
//!   with fixed PNG settings, so identical inputs give identical bytes.
//! - [`MontageCompositor`] delegates to ImageMagick `montage` under a
//!   timeout.
//!
//! The [`audit`] module draws labelled contact sheets for visual review.

pub mod audit;
pub mod font;
pub mod montage;
pub mod png;
pub mod raster;

pub use audit::{AuditError, AuditLayout, AuditSheet};
pub use montage::{MontageCompositor, MontageTool};
pub use self::png::{PngConfig, PngError};
pub use raster::{read_dimensions, RasterCompositor};
