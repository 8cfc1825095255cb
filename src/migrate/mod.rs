// ABOUTME: Schema migration to the target revision.
// ABOUTME: Runs the migration tool once, inside a service container or as a local process.

use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

use crate::config::MigrateConfig;
use crate::runtime::{ContainerManager, ServiceController, exit_status, trimmed};
use crate::types::ServiceName;

/// Migrates the schema. Called once per run, after the database is ready.
#[async_trait]
pub trait Migrator: Send + Sync {
    async fn migrate_to_head(&self) -> Result<(), MigrationError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum MigrationError {
    #[error("migration failed with {}: {}", exit_status(.exit_code), trimmed(.stderr))]
    Failed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("migration tool unavailable: {0}")]
    Unavailable(String),

    #[error("database service {0} did not pass readiness")]
    DatabaseNotReady(ServiceName),
}

/// Where the migration command runs.
#[derive(Debug, Clone)]
enum Location {
    Service(ServiceName),
    Local,
}

/// Runs `command + [target]` and reads only the exit status.
pub struct MigrationRunner<M> {
    controller: Arc<ServiceController<M>>,
    location: Location,
    argv: Vec<String>,
    env: HashMap<String, String>,
}

impl<M: ContainerManager> MigrationRunner<M> {
    pub fn new(controller: Arc<ServiceController<M>>, config: &MigrateConfig) -> Self {
        let location = match &config.service {
            Some(service) => Location::Service(service.clone()),
            None => Location::Local,
        };

        let mut argv = config.command.clone();
        if !config.target.is_empty() {
            argv.push(config.target.clone());
        }

        Self {
            controller,
            location,
            argv,
            env: HashMap::new(),
        }
    }

    /// Environment for a locally run migration.
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    async fn run_local(&self) -> Result<(), MigrationError> {
        let Some((program, args)) = self.argv.split_first() else {
            return Err(MigrationError::Unavailable("empty migration command".to_string()));
        };

        let output = Command::new(program)
            .args(args)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| MigrationError::Unavailable(format!("{program}: {e}")))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(MigrationError::Failed {
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            })
        }
    }

    async fn run_in_service(&self, service: &ServiceName) -> Result<(), MigrationError> {
        let output = self
            .controller
            .manager()
            .exec(service, &self.argv)
            .await
            .map_err(|e| MigrationError::Unavailable(e.to_string()))?;

        if output.success() {
            Ok(())
        } else {
            Err(MigrationError::Failed {
                exit_code: output.exit_code,
                stderr: output.stderr,
            })
        }
    }
}

#[async_trait]
impl<M: ContainerManager> Migrator for MigrationRunner<M> {
    async fn migrate_to_head(&self) -> Result<(), MigrationError> {
        tracing::info!("running migration: {}", self.argv.join(" "));
        match &self.location {
            Location::Service(service) => self.run_in_service(service).await,
            Location::Local => self.run_local().await,
        }
    }
}
