//! Scripted engines standing in for Blender.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use shipsheet_core::{CancelToken, EngineFailure, RenderEngine, RenderRequest};

/// Writes a solid square PNG at the requested resolution, except for models
/// scripted to fail or to write nothing. Every call is counted.
#[derive(Debug, Clone, Default)]
pub struct FakeEngine {
    failing: BTreeSet<String>,
    silent: BTreeSet<String>,
    shade: u8,
    calls: Arc<AtomicUsize>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            shade: 200,
            ..Self::default()
        }
    }

    /// Models with this name report an engine error after leaving a
    /// partial file behind.
    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    /// Models with this name succeed without writing anything.
    pub fn silent(mut self, name: &str) -> Self {
        self.silent.insert(name.to_string());
        self
    }

    /// Red channel of the rendered pixels, to tell renders apart.
    pub fn shade(mut self, shade: u8) -> Self {
        self.shade = shade;
        self
    }

    /// Shared call counter; stays valid after the engine is boxed.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RenderEngine for FakeEngine {
    fn name(&self) -> &str {
        "fake"
    }

    fn render(
        &self,
        request: &RenderRequest<'_>,
        _cancel: &CancelToken,
    ) -> Result<(), EngineFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let name = request.key.rsplit('/').next().unwrap_or(request.key);

        if self.failing.contains(name) {
            let _ = std::fs::write(request.output_path, b"partial");
            return Err(EngineFailure::failed(format!("scripted failure for {}", name)));
        }
        if self.silent.contains(name) {
            return Ok(());
        }

        RgbaImage::from_pixel(
            request.resolution,
            request.resolution,
            Rgba([self.shade, 40, 40, 255]),
        )
        .save(request.output_path)
        .map_err(|e| EngineFailure::failed(e.to_string()))
    }
}
