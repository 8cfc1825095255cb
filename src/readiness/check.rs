// ABOUTME: ReadinessCheck trait and the reasons a single check can fail.
// ABOUTME: One call is one non-blocking attempt; polling lives in wait_until_ready.

use async_trait::async_trait;
use std::time::Duration;

use crate::runtime::{ServiceStatus, exit_status};

/// A single readiness check for one service.
#[async_trait]
pub trait ReadinessCheck: Send + Sync {
    /// Check once. `Ok` means ready.
    async fn check(&self) -> Result<(), CheckFailure>;

    /// Short description for logs and reports, e.g. `GET http://localhost:8000/health`.
    fn describe(&self) -> String;

    /// Check once, collapsing failure to `false`.
    async fn is_ready(&self) -> bool {
        match self.check().await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("{}: {}", self.describe(), e);
                false
            }
        }
    }
}

/// Why a readiness check did not pass.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CheckFailure {
    #[error("unexpected HTTP status {actual} (expected {expected})")]
    Status { expected: u16, actual: u16 },

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("command failed with {}", exit_status(.exit_code))]
    CommandFailed { exit_code: Option<i32> },

    #[error("output did not contain {expected:?}")]
    MissingMarker { expected: String },

    #[error("service is {0}")]
    NotRunning(ServiceStatus),

    #[error("container manager unavailable: {0}")]
    Manager(String),

    #[error("invalid check target: {0}")]
    InvalidTarget(String),
}
