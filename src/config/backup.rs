// ABOUTME: Backup configuration: destination root and the three sub-backups.
// ABOUTME: Each sub-backup is optional and carries its own required flag.

use serde::Deserialize;
use std::path::PathBuf;

use crate::types::ServiceName;

#[derive(Debug, Clone, Deserialize)]
pub struct BackupConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,

    #[serde(default)]
    pub database: Option<DatabaseBackupConfig>,

    #[serde(default)]
    pub models: Option<ModelBackupConfig>,

    #[serde(default)]
    pub config: Option<ConfigBackupConfig>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            database: None,
            models: None,
            config: None,
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("backups")
}

/// Dump the database by running `command` in `service` and saving stdout.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseBackupConfig {
    pub service: ServiceName,
    pub command: Vec<String>,
    #[serde(default = "required_by_default")]
    pub required: bool,
}

/// Archive model artifacts found under `path`.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelBackupConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub required: bool,
}

/// Copy the active configuration files.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigBackupConfig {
    pub files: Vec<PathBuf>,
    #[serde(default = "required_by_default")]
    pub required: bool,
}

fn required_by_default() -> bool {
    true
}
