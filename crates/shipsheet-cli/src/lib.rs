//! Shipsheet CLI library.
//!
//! The render phase (inventory, cache check, dispatch, accounting) and the
//! pack phase (grouping, compositing, metadata) behind the `shipsheet`
//! binary, plus the command implementations that wire them to the console.

pub mod accountant;
pub mod cache;
pub mod cancel;
pub mod commands;
pub mod dispatch;
pub mod grouping;
pub mod inventory;
pub mod pack;
pub mod settings;
