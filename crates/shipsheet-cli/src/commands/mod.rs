//! CLI command implementations

pub mod audit;
pub mod build;
pub mod doctor;
pub mod inventory;
pub mod pack;
pub mod render;

mod reporting;
