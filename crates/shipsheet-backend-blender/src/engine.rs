//! [`RenderEngine`] implementations.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use shipsheet_core::process::tail_lines;
use shipsheet_core::{run_supervised, CancelToken, EngineFailure, RenderEngine, RenderRequest};

use crate::error::{BlenderError, BlenderResult};
use crate::orchestrator::{Orchestrator, OrchestratorConfig, DEFAULT_TIMEOUT_SECS, STDERR_TAIL_LINES};

/// Renders models with Blender and the top-down render script.
#[derive(Debug)]
pub struct BlenderEngine {
    orchestrator: Orchestrator,
}

impl BlenderEngine {
    /// Creates an engine, resolving Blender up front.
    pub fn new(config: OrchestratorConfig) -> BlenderResult<Self> {
        Ok(Self {
            orchestrator: Orchestrator::new(config)?,
        })
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }
}

impl RenderEngine for BlenderEngine {
    fn name(&self) -> &str {
        "blender"
    }

    fn render(&self, request: &RenderRequest<'_>, cancel: &CancelToken) -> Result<(), EngineFailure> {
        self.orchestrator.run(request, cancel).map_err(EngineFailure::from)
    }
}

/// Renders models with an arbitrary external command.
///
/// Arguments may contain placeholders that are substituted per render:
/// `{input}`, `{output}`, `{resolution}`, `{fill_ratio}`, `{key}` and
/// `{directive}` (orientation JSON, empty when the model has none).
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandEngine {
    /// Creates an engine for `program` with an argument template.
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> BlenderResult<Self> {
        let program = program.into();
        if program.as_os_str().is_empty() {
            return Err(BlenderError::invalid_command("program must not be empty"));
        }
        Ok(Self {
            program,
            args,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Sets the per-render timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Expands the argument template for one request.
    pub fn expand_args(&self, request: &RenderRequest<'_>) -> BlenderResult<Vec<OsString>> {
        let directive = match request.directive {
            Some(d) => d.to_json().map_err(BlenderError::SerializeFailed)?,
            None => String::new(),
        };
        let input = request.source_path.to_string_lossy();
        let output = request.output_path.to_string_lossy();
        let resolution = request.resolution.to_string();
        let fill_ratio = format!("{:.4}", request.fill_ratio);

        Ok(self
            .args
            .iter()
            .map(|arg| {
                OsString::from(
                    arg.replace("{input}", &input)
                        .replace("{output}", &output)
                        .replace("{resolution}", &resolution)
                        .replace("{fill_ratio}", &fill_ratio)
                        .replace("{key}", request.key)
                        .replace("{directive}", &directive),
                )
            })
            .collect())
    }

    fn run(&self, request: &RenderRequest<'_>, cancel: &CancelToken) -> BlenderResult<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.expand_args(request)?);
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

impl RenderEngine for CommandEngine {
    fn name(&self) -> &str {
        "command"
    }

    fn render(&self, request: &RenderRequest<'_>, cancel: &CancelToken) -> Result<(), EngineFailure> {
        self.run(request, cancel).map_err(EngineFailure::from)
    }
}
