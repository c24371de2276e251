//! Sheet compositing through ImageMagick `montage`.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use shipsheet_core::process::tail_lines;
use shipsheet_core::{run_supervised, CompositeError, CompositeRequest, Compositor, WaitError};

/// Default timeout for one montage invocation (2 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// How ImageMagick is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MontageTool {
    /// The standalone `montage` binary (ImageMagick 6).
    Montage(PathBuf),
    /// `magick montage` (ImageMagick 7).
    Magick(PathBuf),
}

impl MontageTool {
    /// Finds ImageMagick in `PATH`, preferring `montage`.
    pub fn locate() -> Result<Self, CompositeError> {
        if let Ok(path) = which::which("montage") {
            return Ok(MontageTool::Montage(path));
        }
        if let Ok(path) = which::which("magick") {
            return Ok(MontageTool::Magick(path));
        }
        Err(CompositeError::ToolNotFound {
            tool: "montage".to_string(),
        })
    }

    pub fn program(&self) -> &Path {
        match self {
            MontageTool::Montage(path) | MontageTool::Magick(path) => path,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(self.program());
        if let MontageTool::Magick(_) = self {
            cmd.arg("montage");
        }
        cmd
    }
}

/// Composites sheets with ImageMagick.
///
/// Montage spacing surrounds every tile, including the sheet edges, so only
/// unpadded grids are supported.
#[derive(Debug, Clone)]
pub struct MontageCompositor {
    tool: MontageTool,
    timeout: Duration,
}

impl MontageCompositor {
    /// Locates ImageMagick and creates a compositor.
    pub fn new() -> Result<Self, CompositeError> {
        Ok(Self::with_tool(MontageTool::locate()?))
    }

    pub fn with_tool(tool: MontageTool) -> Self {
        Self {
            tool,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Sets the per-sheet timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn tool(&self) -> &MontageTool {
        &self.tool
    }

    /// Builds the montage command for a request.
    pub fn command(&self, request: &CompositeRequest<'_>) -> Command {
        let plan = request.plan;
        let mut cmd = self.tool.command();
        cmd.args(request.images)
            .arg("-tile")
            .arg(format!("{}x{}", plan.columns, plan.rows))
            .arg("-geometry")
            .arg(format!("{}x{}+0+0", plan.cell_size, plan.cell_size))
            .arg("-background")
            .arg("none")
            .arg(format!("PNG32:{}", request.output_path.display()));
        cmd
    }
}

impl Compositor for MontageCompositor {
    fn name(&self) -> &'static str {
        "montage"
    }

    fn compose(&self, request: &CompositeRequest<'_>) -> Result<(), CompositeError> {
        request.check()?;
        if request.plan.padding > 0 {
            return Err(CompositeError::Unsupported {
                compositor: "montage",
                message: format!(
                    "padding {} requested; use the raster compositor for padded sheets",
                    request.plan.padding
                ),
            });
        }

        if let Some(parent) = request.output_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CompositeError::io(parent, e))?;
        }

        let mut cmd = self.command(request);
        let output = run_supervised(&mut cmd, self.timeout, None).map_err(|e| match e {
            WaitError::Timeout { timeout_secs } => CompositeError::Timeout { timeout_secs },
            WaitError::Spawn(source) | WaitError::Wait(source) => {
                CompositeError::io(self.tool.program(), source)
            }
            WaitError::Cancelled => CompositeError::ProcessFailed {
                exit_code: -1,
                stderr: "cancelled".to_string(),
            },
        })?;

        if !output.status.success() {
            return Err(CompositeError::ProcessFailed {
                exit_code: output.exit_code(),
                stderr: tail_lines(&output.stderr, 10),
            });
        }

        let produced = std::fs::metadata(request.output_path)
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false);
        if !produced {
            return Err(CompositeError::MissingOutput {
                path: request.output_path.to_path_buf(),
            });
        }

        Ok(())
    }
}
