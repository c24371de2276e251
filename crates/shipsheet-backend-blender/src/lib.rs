//! Shipsheet Blender Backend
//!
//! Rendering engines for the shipsheet render phase.
//!
//! # Overview
//!
//! - [`BlenderEngine`] runs Blender in the background with an embedded
//!   Python script that imports one model, orients it top-down, frames an
//!   orthographic camera by the requested fill ratio and renders a
//!   transparent PNG.
//! - [`CommandEngine`] runs any other renderer through an argument template.
//!
//! Both implement [`shipsheet_core::RenderEngine`]. Every invocation is
//! bounded by a timeout and killed on cancellation.
//!
//! # Blender Requirements
//!
//! The orchestrator searches for Blender in:
//!
//! 1. An explicit path (`--blender`)
//! 2. `BLENDER_PATH` environment variable
//! 3. System PATH
//! 4. Common installation locations
//!
//! The render script can be replaced by setting
//! `SHIPSHEET_BLENDER_ENTRYPOINT`.

pub mod engine;
pub mod error;
pub mod orchestrator;

pub use engine::{BlenderEngine, CommandEngine};
pub use error::{BlenderError, BlenderResult};
pub use orchestrator::{find_blender, Orchestrator, OrchestratorConfig, DEFAULT_TIMEOUT_SECS};
