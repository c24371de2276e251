//! Shipsheet Core Library
//!
//! Types shared by every stage of the shipsheet pipeline, which turns a tree
//! of 3D ship models into top-down sprites and packs those sprites into one
//! sheet per group.
//!
//! # Overview
//!
//! The pipeline has two independently re-runnable phases:
//!
//! - **Render phase**: [`ModelEntry`] values are discovered on disk, checked
//!   against existing outputs, and handed to a [`RenderEngine`]. Each attempt
//!   yields a [`RenderOutcome`].
//! - **Pack phase**: rendered images are re-scanned into a [`SpriteGroup`],
//!   a [`GridPlan`] is computed, a [`Compositor`] draws the sheet, and
//!   [`SheetMetadata`] describes where each sprite landed.
//!
//! # Example
//!
//! ```
//! use shipsheet_core::GridPlan;
//!
//! let plan = GridPlan::plan(5, 512, 0).unwrap();
//! assert_eq!((plan.columns, plan.rows), (3, 2));
//! assert_eq!(plan.cell_origin(4), (512, 512));
//! ```
//!
//! # Modules
//!
//! - [`catalog`]: Group inclusion policy and scan configuration
//! - [`compositor`]: Sheet compositing boundary
//! - [`engine`]: Rendering engine boundary and cancellation
//! - [`entry`]: Model entries and output path derivation
//! - [`error`]: Stable error codes shared by all stages
//! - [`grid`]: Near-square grid planning
//! - [`group`]: Ordered sprite groups
//! - [`metadata`]: Sheet metadata records
//! - [`orientation`]: Orientation override store
//! - [`outcome`]: Render outcome classification
//! - [`process`]: Supervised external processes with timeouts
//! - [`sizes`]: Size table and framing fill ratio

pub mod catalog;
pub mod compositor;
pub mod engine;
pub mod entry;
pub mod error;
pub mod grid;
pub mod group;
pub mod metadata;
pub mod orientation;
pub mod outcome;
pub mod process;
pub mod sizes;

// Re-export commonly used types at the crate root
pub use catalog::{CatalogConfig, ConfigError, GroupPolicy};
pub use compositor::{CompositeError, CompositeRequest, Compositor};
pub use engine::{CancelToken, ChildGuard, EngineFailure, RenderEngine, RenderRequest};
pub use entry::{ModelEntry, SPRITE_EXTENSION};
pub use error::{StageError, StoreError};
pub use grid::GridPlan;
pub use group::{SpriteGroup, SpriteMember};
pub use metadata::{MetadataWriteError, SheetMetadata, SpriteRecord};
pub use orientation::{Axis, OrientationDirective, OrientationStore};
pub use outcome::{RenderFailure, RenderOutcome, RenderStatus};
pub use process::{run_supervised, ProcessOutput, WaitError};
pub use sizes::{fill_ratio, SizeTable};
