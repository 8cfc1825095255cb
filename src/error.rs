// ABOUTME: Application-wide error types for stackup.
// ABOUTME: Uses thiserror for ergonomic error handling; exit codes are derived here.

use std::path::PathBuf;
use thiserror::Error;

use crate::backup::BackupError;
use crate::deploy::{LockError, StageFamily};

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error("concurrent run rejected: {0}")]
    ConcurrentRunRejected(LockError),

    #[error("lock error: {0}")]
    Lock(LockError),

    #[error("deployment aborted at {stage}")]
    Aborted { family: StageFamily, stage: String },

    #[error("stack is {0}")]
    Unhealthy(crate::health::Overall),
}

impl From<LockError> for Error {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Held { .. } => Error::ConcurrentRunRejected(err),
            LockError::Io { .. } => Error::Lock(err),
        }
    }
}

impl Error {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Backup(_) => StageFamily::Backup.exit_code(),
            Error::ConcurrentRunRejected(_) => 7,
            Error::Aborted { family, .. } => family.exit_code(),
            Error::Unhealthy(overall) => overall.exit_code(),
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
