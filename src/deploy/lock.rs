// ABOUTME: Deploy lock to reject concurrent runs against the same project.
// ABOUTME: Uses atomic file creation with lock info stored in the project state directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Information about who holds a deploy lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    /// Process ID of the lock holder.
    pub pid: u32,
    /// When the lock was acquired.
    pub started_at: DateTime<Utc>,
    pub project: String,
}

impl LockInfo {
    /// Create new lock info for the current process.
    pub fn new(project: &str) -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at: Utc::now(),
            project: project.to_string(),
        }
    }

    /// Check if this lock is stale (older than 1 hour).
    pub fn is_stale(&self) -> bool {
        let age = Utc::now() - self.started_at;
        age.num_hours() >= 1
    }

    /// Path to the lock file for a project.
    pub fn lock_path(state_dir: &Path, project: &str) -> PathBuf {
        state_dir.join(format!("{project}.lock"))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("deployment already in progress (held by {holder}, pid {pid}, since {started_at})")]
    Held {
        holder: String,
        pid: u32,
        started_at: DateTime<Utc>,
        path: PathBuf,
    },

    #[error("lock error at {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },
}

impl LockError {
    fn io(path: &Path, message: impl std::fmt::Display) -> Self {
        LockError::Io {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }
}

/// A held deploy lock. Released explicitly with [`DeployLock::release`].
#[derive(Debug)]
pub struct DeployLock {
    path: PathBuf,
}

impl DeployLock {
    /// Acquire the lock for `project` under `state_dir`.
    ///
    /// Creation is atomic (`create_new`), so two racing runs cannot both win.
    /// Stale (>1 hour), corrupt or unreadable locks are broken with a warning;
    /// `force` breaks any lock.
    pub async fn acquire(state_dir: &Path, project: &str, force: bool) -> Result<Self, LockError> {
        tokio::fs::create_dir_all(state_dir)
            .await
            .map_err(|e| LockError::io(state_dir, format!("failed to create state directory: {e}")))?;

        let path = LockInfo::lock_path(state_dir, project);
        let info = LockInfo::new(project);
        let json = serde_json::to_vec(&info)
            .map_err(|e| LockError::io(&path, format!("failed to serialize lock: {e}")))?;

        if Self::try_create(&path, &json).await? {
            return Ok(Self { path });
        }

        if let Some(existing) = Self::existing_holder(&path, force).await {
            return Err(LockError::Held {
                holder: existing.holder,
                pid: existing.pid,
                started_at: existing.started_at,
                path,
            });
        }

        tracing::debug!("removing stale/forced lock at {}", path.display());
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(LockError::io(&path, format!("failed to break lock: {e}"))),
        }

        if Self::try_create(&path, &json).await? {
            Ok(Self { path })
        } else {
            Err(LockError::io(
                &path,
                "lock acquired by another process during break",
            ))
        }
    }

    /// Returns false if the file already exists.
    async fn try_create(path: &Path, json: &[u8]) -> Result<bool, LockError> {
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await;

        let mut file = match file {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(LockError::io(path, format!("failed to create lock: {e}"))),
        };

        file.write_all(json)
            .await
            .map_err(|e| LockError::io(path, format!("failed to write lock: {e}")))?;
        file.flush()
            .await
            .map_err(|e| LockError::io(path, format!("failed to write lock: {e}")))?;
        Ok(true)
    }

    /// The current holder if the existing lock must be respected, `None` if it can be broken.
    async fn existing_holder(path: &Path, force: bool) -> Option<LockInfo> {
        let contents = match tokio::fs::read(path).await {
            Ok(contents) => contents,
            Err(_) => {
                tracing::warn!("lock info unreadable, breaking lock");
                return None;
            }
        };

        match serde_json::from_slice::<LockInfo>(&contents) {
            Ok(existing) if force => {
                tracing::warn!(
                    "breaking lock held by {} (pid {}) since {}",
                    existing.holder,
                    existing.pid,
                    existing.started_at
                );
                None
            }
            Ok(existing) if existing.is_stale() => {
                tracing::warn!(
                    "auto-breaking stale lock held by {} (pid {}) since {}",
                    existing.holder,
                    existing.pid,
                    existing.started_at
                );
                None
            }
            Ok(existing) => Some(existing),
            Err(_) => {
                tracing::warn!("lock info corrupted, breaking lock");
                None
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock.
    pub async fn release(self) -> Result<(), LockError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LockError::io(&self.path, format!("failed to release lock: {e}"))),
        }
    }

    /// Run `work` while holding the lock. The lock is released whatever `work` returns.
    pub async fn with_lock<F, T>(
        state_dir: &Path,
        project: &str,
        force: bool,
        work: F,
    ) -> Result<T, LockError>
    where
        F: Future<Output = T>,
    {
        let lock = Self::acquire(state_dir, project, force).await?;
        let value = work.await;
        if let Err(e) = lock.release().await {
            tracing::warn!("{}", e);
        }
        Ok(value)
    }
}
