// ABOUTME: Schema migration configuration.
// ABOUTME: Command, target revision, and where the command runs.

use serde::Deserialize;

use crate::types::ServiceName;

#[derive(Debug, Clone, Deserialize)]
pub struct MigrateConfig {
    /// Run inside this service container; locally when unset.
    #[serde(default)]
    pub service: Option<ServiceName>,

    /// Database service that must have passed readiness before migrating.
    #[serde(default)]
    pub database: Option<ServiceName>,

    /// Command prefix; the target revision is appended.
    #[serde(default = "default_command")]
    pub command: Vec<String>,

    #[serde(default = "default_target")]
    pub target: String,
}

pub(super) fn default_command() -> Vec<String> {
    vec!["alembic".to_string(), "upgrade".to_string()]
}

pub(super) fn default_target() -> String {
    "head".to_string()
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            service: None,
            database: None,
            command: default_command(),
            target: default_target(),
        }
    }
}
