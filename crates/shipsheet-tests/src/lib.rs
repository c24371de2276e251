//! Shipsheet End-to-End Test Infrastructure
//!
//! Integration tests for both phases of the pipeline:
//!
//! - **Render**: model tree -> sprites, with idempotent re-runs
//! - **Pack**: sprites -> one sheet and one metadata file per group
//!
//! ## Running Tests
//!
//! ```bash
//! # Run everything that needs no external tools
//! cargo test -p shipsheet-tests
//!
//! # Run Blender tests (requires Blender)
//! SHIPSHEET_RUN_BLENDER_TESTS=1 cargo test -p shipsheet-tests -- --ignored
//! ```

pub mod fakes;
pub mod harness;

pub use fakes::FakeEngine;
pub use harness::{is_blender_available, should_run_blender_tests, TestHarness};
