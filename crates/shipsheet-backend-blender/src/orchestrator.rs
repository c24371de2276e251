//! Blender subprocess orchestrator.
//!
//! This module locates Blender and the Python render script, builds the
//! command line for one render, and supervises the process until it exits,
//! times out or is cancelled.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use shipsheet_core::process::tail_lines;
use shipsheet_core::{run_supervised, CancelToken, RenderRequest};

use crate::error::{BlenderError, BlenderResult};

const EMBEDDED_ENTRYPOINT_PY: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../blender/render_topdown.py"
));

/// Default timeout for one render (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Number of stderr lines kept in failure details.
pub const STDERR_TAIL_LINES: usize = 20;

/// Environment variable overriding the embedded render script.
pub const ENTRYPOINT_ENV: &str = "SHIPSHEET_BLENDER_ENTRYPOINT";

/// Configuration for the Blender orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Path to the Blender executable.
    pub blender_path: Option<PathBuf>,
    /// Path to the Python render script.
    pub entrypoint_path: Option<PathBuf>,
    /// Timeout for one render.
    pub timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            blender_path: None,
            entrypoint_path: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl OrchestratorConfig {
    /// Sets the Blender executable path.
    pub fn blender_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.blender_path = Some(path.into());
        self
    }

    /// Sets the render script path.
    pub fn entrypoint_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.entrypoint_path = Some(path.into());
        self
    }

    /// Sets the timeout duration.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the timeout in seconds.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }
}

/// Finds the Blender executable.
///
/// Search order: explicit path, `BLENDER_PATH`, `PATH`, then common
/// installation locations.
pub fn find_blender(explicit: Option<&Path>) -> BlenderResult<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(BlenderError::ExecutableMissing {
            path: path.to_path_buf(),
        });
    }

    if let Ok(path) = std::env::var("BLENDER_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Ok(path);
        }
    }

    let blender_names: &[&str] = if cfg!(windows) {
        &["blender.exe", "blender"]
    } else {
        &["blender"]
    };

    for name in blender_names {
        if let Ok(path) = which::which(name) {
            return Ok(path);
        }
    }

    let common_paths: &[&str] = if cfg!(windows) {
        &[
            "C:\\Program Files\\Blender Foundation\\Blender 4.2\\blender.exe",
            "C:\\Program Files\\Blender Foundation\\Blender 4.0\\blender.exe",
            "C:\\Program Files\\Blender Foundation\\Blender\\blender.exe",
        ]
    } else if cfg!(target_os = "macos") {
        &[
            "/Applications/Blender.app/Contents/MacOS/Blender",
            "/Applications/Blender.app/Contents/MacOS/blender",
        ]
    } else {
        &[
            "/usr/bin/blender",
            "/usr/local/bin/blender",
            "/snap/bin/blender",
        ]
    };

    for path_str in common_paths {
        let path = PathBuf::from(path_str);
        if path.exists() {
            return Ok(path);
        }
    }

    Err(BlenderError::BlenderNotFound)
}

/// A render script on disk. Holds the temp file alive when the embedded
/// script was used.
#[derive(Debug)]
pub struct ResolvedEntrypoint {
    path: PathBuf,
    _tempfile: Option<tempfile::NamedTempFile>,
}

impl ResolvedEntrypoint {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when the embedded script is in use.
    pub fn is_embedded(&self) -> bool {
        self._tempfile.is_some()
    }
}

/// Resolves the render script: configured path, then the
/// `SHIPSHEET_BLENDER_ENTRYPOINT` variable, then the embedded script.
pub fn resolve_entrypoint(configured: Option<&Path>) -> BlenderResult<ResolvedEntrypoint> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(ResolvedEntrypoint {
                path: path.to_path_buf(),
                _tempfile: None,
            });
        }
        return Err(BlenderError::EntrypointNotFound {
            path: path.to_path_buf(),
        });
    }

    if let Ok(path) = std::env::var(ENTRYPOINT_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Ok(ResolvedEntrypoint {
                path,
                _tempfile: None,
            });
        }
        return Err(BlenderError::EntrypointNotFound { path });
    }

    let mut file = tempfile::Builder::new()
        .prefix("shipsheet_render_topdown_")
        .suffix(".py")
        .tempfile()?;
    file.write_all(EMBEDDED_ENTRYPOINT_PY.as_bytes())?;
    file.flush()?;

    Ok(ResolvedEntrypoint {
        path: file.path().to_path_buf(),
        _tempfile: Some(file),
    })
}

/// The Blender subprocess orchestrator.
///
/// Executable and script are resolved once, so a missing Blender install
/// fails the run before any model is dispatched.
#[derive(Debug)]
pub struct Orchestrator {
    blender_path: PathBuf,
    entrypoint: ResolvedEntrypoint,
    timeout: Duration,
}

impl Orchestrator {
    /// Creates an orchestrator, resolving Blender and the render script.
    pub fn new(config: OrchestratorConfig) -> BlenderResult<Self> {
        let blender_path = find_blender(config.blender_path.as_deref())?;
        let entrypoint = resolve_entrypoint(config.entrypoint_path.as_deref())?;
        Ok(Self {
            blender_path,
            entrypoint,
            timeout: config.timeout,
        })
    }

    pub fn blender_path(&self) -> &Path {
        &self.blender_path
    }

    pub fn entrypoint(&self) -> &ResolvedEntrypoint {
        &self.entrypoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Builds the command for one render.
    ///
    /// `blender --background --factory-startup --python-exit-code 1
    /// --python <script> --
    /// --input <src> --output <dst> --resolution <n> --fill-ratio <f>
    /// [--directive <json>]`
    pub fn command(&self, request: &RenderRequest<'_>) -> BlenderResult<Command> {
        let mut cmd = Command::new(&self.blender_path);
        cmd.arg("--background")
            .arg("--factory-startup")
            .arg("--python-exit-code")
            .arg("1")
            .arg("--python")
            .arg(self.entrypoint.path())
            .arg("--")
            .arg("--input")
            .arg(request.source_path)
            .arg("--output")
            .arg(request.output_path)
            .arg("--resolution")
            .arg(request.resolution.to_string())
            .arg("--fill-ratio")
            .arg(format!("{:.4}", request.fill_ratio));

        if let Some(directive) = request.directive {
            let json = directive.to_json().map_err(BlenderError::SerializeFailed)?;
            cmd.arg("--directive").arg(json);
        }

        Ok(cmd)
    }

    /// Runs one render to completion.
    ///
    /// Success means Blender exited with status zero. Whether the image was
    /// written is for the caller to check.
    pub fn run(&self, request: &RenderRequest<'_>, cancel: &CancelToken) -> BlenderResult<()> {
        let mut cmd = self.command(request)?;
        let output = run_supervised(&mut cmd, self.timeout, Some(cancel))?;

        if !output.status.success() {
            return Err(BlenderError::process_failed(
                output.exit_code(),
                tail_lines(&output.stderr, STDERR_TAIL_LINES),
            ));
        }

        Ok(())
    }
}
