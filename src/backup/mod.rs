// ABOUTME: Timestamped, immutable backups taken before any mutating deployment step.
// ABOUTME: Database dump, model archive and config copy run independently; failures are recorded per part.

mod artifacts;
mod error;

pub use artifacts::{CONFIG_DIRNAME, DATABASE_DUMP_FILENAME, MODEL_ARCHIVE_FILENAME};
pub use error::{BackupError, SubBackupError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::BackupConfig;
use crate::runtime::{ContainerManager, ServiceController};
use crate::types::BackupId;

pub const MANIFEST_FILENAME: &str = "manifest.json";

/// One kind of data captured by a backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Artifact {
    DatabaseDump,
    ModelArchive,
    ConfigCopy,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::DatabaseDump => write!(f, "database dump"),
            Artifact::ModelArchive => write!(f, "model archive"),
            Artifact::ConfigCopy => write!(f, "config copy"),
        }
    }
}

/// A sub-backup that did not produce its artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubBackupFailure {
    pub artifact: Artifact,
    pub required: bool,
    pub error: String,
}

/// A completed (possibly partial) backup. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Backup {
    id: BackupId,
    path: PathBuf,
    created_at: DateTime<Utc>,
    contents: BTreeSet<Artifact>,
    failures: Vec<SubBackupFailure>,
}

impl Backup {
    pub fn id(&self) -> &BackupId {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Artifacts that were written and passed the non-empty check.
    pub fn contents(&self) -> &BTreeSet<Artifact> {
        &self.contents
    }

    pub fn failures(&self) -> &[SubBackupFailure] {
        &self.failures
    }

    /// Failed sub-backups whose data must be safe before mutating anything.
    pub fn required_failures(&self) -> impl Iterator<Item = &SubBackupFailure> {
        self.failures.iter().filter(|f| f.required)
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Creates backups. The orchestrator only sees this seam.
#[async_trait]
pub trait BackupOps: Send + Sync {
    async fn create_backup(&self, plan: &BackupConfig) -> Result<Backup, BackupError>;
}

/// Writes backups under `plan.root/<id>/`.
pub struct BackupManager<M> {
    controller: Arc<ServiceController<M>>,
}

impl<M: ContainerManager> BackupManager<M> {
    pub fn new(controller: Arc<ServiceController<M>>) -> Self {
        Self { controller }
    }

    /// Create a backup under an explicit identifier.
    ///
    /// Fails with [`BackupError::AlreadyExists`] if the directory is present;
    /// an existing backup is never overwritten.
    pub async fn create_backup_as(
        &self,
        plan: &BackupConfig,
        id: BackupId,
    ) -> Result<Backup, BackupError> {
        tokio::fs::create_dir_all(&plan.root)
            .await
            .map_err(|e| BackupError::io(&plan.root, e))?;

        let path = plan.root.join(id.as_str());
        match tokio::fs::create_dir(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(BackupError::AlreadyExists { id, path });
            }
            Err(e) => return Err(BackupError::io(&path, e)),
        }

        tracing::info!("creating backup {} in {}", id, path.display());

        let mut attempted = 0usize;
        let mut contents = BTreeSet::new();
        let mut failures = Vec::new();

        let mut record = |artifact: Artifact, required: bool, result: Result<u64, SubBackupError>| {
            attempted += 1;
            match result {
                Ok(bytes) => {
                    tracing::info!("{} saved ({} bytes)", artifact, bytes);
                    contents.insert(artifact);
                }
                Err(e) => {
                    if required {
                        tracing::error!("{} failed: {}", artifact, e);
                    } else {
                        tracing::warn!("{} failed: {}", artifact, e);
                    }
                    failures.push(SubBackupFailure {
                        artifact,
                        required,
                        error: e.to_string(),
                    });
                }
            }
        };

        if let Some(db) = &plan.database {
            let result = artifacts::dump_database(self.controller.manager(), db, &path).await;
            record(Artifact::DatabaseDump, db.required, result);
        }

        if let Some(models) = &plan.models {
            let result = artifacts::archive_models(&models.path, &path).await;
            record(Artifact::ModelArchive, models.required, result);
        }

        if let Some(config) = &plan.config {
            let result = artifacts::copy_config(&config.files, &path).await;
            record(Artifact::ConfigCopy, config.required, result);
        }

        if attempted > 0 && contents.is_empty() {
            return Err(BackupError::Total { id, failures });
        }

        let backup = Backup {
            id,
            path,
            created_at: Utc::now(),
            contents,
            failures,
        };

        let manifest = serde_json::to_vec_pretty(&backup)
            .map_err(|e| BackupError::Manifest(e.to_string()))?;
        tokio::fs::write(backup.path.join(MANIFEST_FILENAME), manifest)
            .await
            .map_err(|e| BackupError::io(&backup.path, e))?;

        Ok(backup)
    }
}

#[async_trait]
impl<M: ContainerManager> BackupOps for BackupManager<M> {
    async fn create_backup(&self, plan: &BackupConfig) -> Result<Backup, BackupError> {
        self.create_backup_as(plan, BackupId::generate()).await
    }
}
