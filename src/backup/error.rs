// ABOUTME: Backup error types.
// ABOUTME: Distinguishes total failure, required-part failure and identifier collisions.

use std::path::{Path, PathBuf};

use super::SubBackupFailure;
use crate::types::BackupId;

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    /// A backup with this identifier already exists; it is never overwritten.
    #[error("backup {id} already exists at {}", .path.display())]
    AlreadyExists { id: BackupId, path: PathBuf },

    /// Every configured sub-backup failed.
    #[error("backup {id} failed completely: {}", describe_failures(.failures))]
    Total {
        id: BackupId,
        failures: Vec<SubBackupFailure>,
    },

    /// Some sub-backups succeeded but a required one did not.
    #[error("backup {id} is missing required data: {}", describe_failures(.failures))]
    RequiredFailed {
        id: BackupId,
        failures: Vec<SubBackupFailure>,
    },

    #[error("I/O error at {path}: {message}")]
    Io { path: String, message: String },

    #[error("failed to write backup manifest: {0}")]
    Manifest(String),
}

impl BackupError {
    pub(crate) fn io(path: &Path, err: std::io::Error) -> Self {
        BackupError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

fn describe_failures(failures: &[SubBackupFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.artifact, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Why one sub-backup did not produce its artifact.
#[derive(Debug, thiserror::Error)]
pub enum SubBackupError {
    #[error("dump command failed: {0}")]
    Dump(String),

    #[error("source not found: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("{} is empty", .0.display())]
    Empty(PathBuf),

    #[error(
        "{} and {} would both be saved as {}",
        .first.display(),
        .second.display(),
        .name.display()
    )]
    NameCollision {
        first: PathBuf,
        second: PathBuf,
        name: PathBuf,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
