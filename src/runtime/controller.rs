// ABOUTME: ServiceController wraps the container manager for the orchestrator.
// ABOUTME: Build and start surface exit codes; status degrades to Unknown instead of failing.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::manager::{ContainerManager, ManagerError, exit_status, trimmed};
use crate::types::ServiceName;

/// Running state of one service as seen by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Up,
    Down,
    /// The manager could not be queried; treated as "not yet ready".
    Unknown,
}

impl ServiceStatus {
    /// Interpret `ps` output. Any row reporting `Up ...` or `running` counts as up.
    pub fn parse(output: &str) -> Self {
        let running = output
            .lines()
            .filter(|line| !line.trim_start().starts_with("NAME"))
            .any(|line| {
                line.split_whitespace()
                    .any(|word| word == "Up" || word.eq_ignore_ascii_case("running"))
            });

        if running {
            ServiceStatus::Up
        } else {
            ServiceStatus::Down
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceStatus::Up => write!(f, "up"),
            ServiceStatus::Down => write!(f, "down"),
            ServiceStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Build/start failures. Services may be partially started after `Start`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ServiceError {
    #[error("{operation} failed with {}: {}", exit_status(.exit_code), trimmed(.stderr))]
    CommandFailed {
        operation: &'static str,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("{operation} could not run: {message}")]
    Unavailable {
        operation: &'static str,
        message: String,
    },
}

impl ServiceError {
    fn from_manager(operation: &'static str, err: ManagerError) -> Self {
        match err {
            ManagerError::Unavailable { program, message } => ServiceError::Unavailable {
                operation,
                message: format!("{program}: {message}"),
            },
            ManagerError::Failed {
                exit_code, stderr, ..
            } => ServiceError::CommandFailed {
                operation,
                exit_code,
                stderr,
            },
        }
    }
}

/// Service lifecycle operations used by the orchestrator.
#[derive(Debug)]
pub struct ServiceController<M> {
    manager: M,
    pull: bool,
}

impl<M: ContainerManager> ServiceController<M> {
    pub fn new(manager: M) -> Self {
        Self {
            manager,
            pull: true,
        }
    }

    /// Whether `build` pulls registry images first.
    pub fn with_pull(mut self, pull: bool) -> Self {
        self.pull = pull;
        self
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    /// Pull (if enabled) and build all images.
    pub async fn build(&self) -> Result<(), ServiceError> {
        if self.pull {
            tracing::info!("pulling images");
            self.manager
                .pull()
                .await
                .map_err(|e| ServiceError::from_manager("pull", e))?;
        }

        tracing::info!("building images");
        self.manager
            .build()
            .await
            .map_err(|e| ServiceError::from_manager("build", e))
    }

    /// Start every service in the background.
    pub async fn start_all(&self) -> Result<(), ServiceError> {
        tracing::info!("starting services");
        self.manager
            .up()
            .await
            .map_err(|e| ServiceError::from_manager("start", e))
    }

    /// Current status of one service. Never fails: query errors become `Unknown`.
    pub async fn status(&self, service: &ServiceName) -> ServiceStatus {
        match self.manager.status(service).await {
            Ok(output) => ServiceStatus::parse(&output),
            Err(e) => {
                tracing::debug!("status query for {} failed: {}", service, e);
                ServiceStatus::Unknown
            }
        }
    }
}
