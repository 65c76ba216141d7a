//! Starting the application after an update.
//!
//! The updater hands the main entry file to an interpreter as its only
//! argument. [`Launcher`] is the seam: [`ProcessLauncher`] spawns a real
//! process, [`RecordingLauncher`] only records what would have been started.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::process::Command;
use tracing::{debug, info};

use crate::core::UpdaterError;

/// Whether the updater waits for the launched application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LaunchMode {
    /// Block until the application exits.
    #[default]
    Wait,
    /// Spawn the application and return immediately.
    Detach,
}

/// A request to start the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    /// Interpreter path, or a bare name looked up on `PATH`.
    pub interpreter: String,
    /// Main entry file, passed as the sole argument.
    pub program: PathBuf,
    /// Working directory of the new process.
    pub working_dir: PathBuf,
    /// Wait or detach.
    pub mode: LaunchMode,
}

/// How a launch ended, from the updater's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// The application ran to completion. `code` is `None` when it was
    /// terminated by a signal.
    Exited {
        /// Exit code.
        code: Option<i32>,
    },
    /// The application was started and left running.
    Detached {
        /// Process id, when the platform reports one.
        pid: Option<u32>,
    },
}

/// Starts the main application.
pub trait Launcher: Send + Sync {
    /// Start `request.program` with `request.interpreter`.
    fn launch(
        &self,
        request: &LaunchRequest,
    ) -> impl Future<Output = Result<LaunchOutcome>> + Send;
}

/// Spawns the application as a child process with inherited stdio.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

impl ProcessLauncher {
    /// Resolve a bare interpreter name on `PATH`; paths are used as given.
    fn resolve_interpreter(interpreter: &str) -> Result<PathBuf> {
        let candidate = Path::new(interpreter);
        if candidate.components().count() > 1 || candidate.is_absolute() {
            return Ok(candidate.to_path_buf());
        }
        which::which(interpreter)
            .with_context(|| format!("Interpreter '{interpreter}' not found on PATH"))
    }
}

impl Launcher for ProcessLauncher {
    async fn launch(&self, request: &LaunchRequest) -> Result<LaunchOutcome> {
        let launch_error = |reason: String| UpdaterError::LaunchFailed {
            program: request.program.display().to_string(),
            reason,
        };

        let interpreter = Self::resolve_interpreter(&request.interpreter)
            .map_err(|e| launch_error(format!("{e:#}")))?;

        info!(
            "Launching {} {} ({:?})",
            interpreter.display(),
            request.program.display(),
            request.mode
        );

        let mut command = Command::new(&interpreter);
        command.arg(&request.program).current_dir(&request.working_dir);

        match request.mode {
            LaunchMode::Wait => {
                let status = command.status().await.map_err(|e| launch_error(e.to_string()))?;
                debug!("Application exited with {}", status);
                Ok(LaunchOutcome::Exited {
                    code: status.code(),
                })
            }
            LaunchMode::Detach => {
                let child = command.spawn().map_err(|e| launch_error(e.to_string()))?;
                let pid = child.id();
                debug!("Application detached with pid {:?}", pid);
                Ok(LaunchOutcome::Detached {
                    pid,
                })
            }
        }
    }
}

/// Launcher that records requests instead of spawning processes.
#[derive(Debug)]
pub struct RecordingLauncher {
    requests: Mutex<Vec<LaunchRequest>>,
    outcome: Option<LaunchOutcome>,
}

impl Default for RecordingLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingLauncher {
    /// Records and reports a clean exit for every request.
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            outcome: Some(LaunchOutcome::Exited {
                code: Some(0),
            }),
        }
    }

    /// Records and fails every request with [`UpdaterError::LaunchFailed`].
    pub fn failing() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            outcome: None,
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<LaunchRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Launcher for RecordingLauncher {
    async fn launch(&self, request: &LaunchRequest) -> Result<LaunchOutcome> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        self.outcome.ok_or_else(|| {
            UpdaterError::LaunchFailed {
                program: request.program.display().to_string(),
                reason: "launch disabled".to_string(),
            }
            .into()
        })
    }
}
