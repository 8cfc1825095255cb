// ABOUTME: Capability trait for the external container manager.
// ABOUTME: Pull, build, up, status and exec, with captured command output.

use async_trait::async_trait;
use std::borrow::Cow;

use crate::types::ServiceName;

/// Operations the orchestrator needs from the container/process manager.
///
/// Implementations shell out or call an API; the orchestrator only reads
/// pass/fail and captured diagnostics.
#[async_trait]
pub trait ContainerManager: Send + Sync {
    /// Pull the images of all services.
    async fn pull(&self) -> Result<(), ManagerError>;

    /// Build the images of all services that have a build context.
    async fn build(&self) -> Result<(), ManagerError>;

    /// Create and start all services in the background.
    async fn up(&self) -> Result<(), ManagerError>;

    /// Raw textual status of one service, as printed by the manager.
    async fn status(&self, service: &ServiceName) -> Result<String, ManagerError>;

    /// Run a command inside a service container.
    ///
    /// A non-zero exit status is returned in [`ExecOutput`], not as an error.
    async fn exec(&self, service: &ServiceName, command: &[String])
    -> Result<ExecOutput, ManagerError>;
}

/// Captured result of a command run by the manager.
///
/// `stdout` is kept as raw bytes: database dumps are binary.
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Lossy text view of stdout for marker matching and status parsing.
    pub fn stdout_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }
}

/// Errors from the container manager.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ManagerError {
    /// The manager binary could not be launched or queried.
    #[error("failed to run {program}: {message}")]
    Unavailable { program: String, message: String },

    /// The manager ran but reported failure.
    #[error("`{command}` failed with {}: {}", exit_status(.exit_code), trimmed(.stderr))]
    Failed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },
}

impl ManagerError {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ManagerError::Unavailable { .. } => None,
            ManagerError::Failed { exit_code, .. } => *exit_code,
        }
    }

    pub fn stderr(&self) -> &str {
        match self {
            ManagerError::Unavailable { message, .. } => message,
            ManagerError::Failed { stderr, .. } => stderr,
        }
    }
}

/// Human-readable exit status, `signal` when the process had no exit code.
pub fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "signal".to_string(),
    }
}

pub(crate) fn trimmed(text: &str) -> &str {
    text.trim()
}
