// ABOUTME: The immutable deployment plan: ordered service specs plus global settings.
// ABOUTME: Built once per invocation; the only place PATH and credentials are read.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{
    BackupConfig, Config, MigrateConfig, ModelConfig, ReadinessConfig, resolve_env_map,
};
use crate::error::{Error, Result};
use crate::readiness::{ExecCheck, HttpCheck, ReadinessCheck, RunningCheck};
use crate::runtime::{ContainerManager, ServiceController};
use crate::types::ServiceName;

use super::error::{PrereqError, Unmet};

/// One dependent service and how to tell that it is ready.
#[derive(Clone)]
pub struct ServiceSpec {
    pub name: ServiceName,
    pub readiness_check: Arc<dyn ReadinessCheck>,
    pub startup_timeout: Duration,
    pub required: bool,
}

impl ServiceSpec {
    /// A required service.
    pub fn new(
        name: ServiceName,
        readiness_check: Arc<dyn ReadinessCheck>,
        startup_timeout: Duration,
    ) -> Self {
        Self {
            name,
            readiness_check,
            startup_timeout,
            required: true,
        }
    }

    /// Mark the service optional: failing it degrades instead of aborting.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

impl fmt::Debug for ServiceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceSpec")
            .field("name", &self.name)
            .field("readiness_check", &self.readiness_check.describe())
            .field("startup_timeout", &self.startup_timeout)
            .field("required", &self.required)
            .finish()
    }
}

/// External tools and credentials snapshotted when the plan is built.
#[derive(Debug, Clone, Default)]
pub struct Prerequisites {
    pub tools: Vec<String>,
    pub search_path: Vec<PathBuf>,
    pub missing_credentials: Vec<String>,
    pub compose_file: Option<PathBuf>,
}

impl Prerequisites {
    /// Snapshot PATH and the required environment for `config`.
    pub fn from_config(config: &Config) -> Self {
        let search_path = std::env::var_os("PATH")
            .map(|p| std::env::split_paths(&p).collect())
            .unwrap_or_default();

        let (_, mut missing) = resolve_env_map(&config.env);
        for var in &config.prereqs.env {
            if std::env::var_os(var).is_none_or(|v| v.is_empty()) {
                missing.push(var.clone());
            }
        }
        missing.sort();
        missing.dedup();

        Self {
            tools: config.prereqs.tools.clone(),
            search_path,
            missing_credentials: missing,
            compose_file: Some(config.compose_file.clone()),
        }
    }

    /// Verify everything is present, reporting every unmet requirement.
    pub fn check(&self) -> std::result::Result<String, PrereqError> {
        let mut unmet = Vec::new();

        for tool in &self.tools {
            if !self.tool_exists(tool) {
                unmet.push(Unmet::Tool(tool.clone()));
            }
        }

        for var in &self.missing_credentials {
            unmet.push(Unmet::Credential(var.clone()));
        }

        if let Some(file) = &self.compose_file
            && !file.is_file()
        {
            unmet.push(Unmet::ComposeFile(file.clone()));
        }

        if unmet.is_empty() {
            Ok(format!(
                "{} tool(s) found, no missing credentials",
                self.tools.len()
            ))
        } else {
            Err(PrereqError { unmet })
        }
    }

    fn tool_exists(&self, tool: &str) -> bool {
        let path = Path::new(tool);
        if path.components().count() > 1 {
            return path.is_file();
        }
        self.search_path.iter().any(|dir| dir.join(tool).is_file())
    }
}

/// Everything one deployment run needs. Read-only once built.
#[derive(Debug, Clone)]
pub struct DeploymentPlan {
    pub project: String,
    pub services: Vec<ServiceSpec>,
    pub backup: BackupConfig,
    pub migration: Option<MigrateConfig>,
    pub models: Vec<ModelConfig>,
    pub max_total_wait: Duration,
    pub poll_interval: Duration,
    pub prereqs: Prerequisites,
}

impl DeploymentPlan {
    /// A plan with default timings and no backups, migration, models or prerequisites.
    pub fn new(project: impl Into<String>, services: Vec<ServiceSpec>) -> Result<Self> {
        let plan = Self {
            project: project.into(),
            services,
            backup: BackupConfig::default(),
            migration: None,
            models: Vec::new(),
            max_total_wait: Duration::from_secs(300),
            poll_interval: Duration::from_secs(2),
            prereqs: Prerequisites::default(),
        };
        plan.validate()?;
        Ok(plan)
    }

    /// Build the plan for `config`, wiring readiness checks to `controller`.
    pub fn from_config<M: ContainerManager + 'static>(
        config: &Config,
        controller: Arc<ServiceController<M>>,
    ) -> Result<Self> {
        let services = config
            .services
            .iter()
            .map(|service| {
                let check: Arc<dyn ReadinessCheck> = match &service.readiness {
                    ReadinessConfig::Http {
                        url,
                        status,
                        request_timeout,
                    } => Arc::new(
                        HttpCheck::new(url)
                            .map_err(|e| {
                                Error::InvalidConfig(format!("service {}: {}", service.name, e))
                            })?
                            .expect_status(*status)
                            .request_timeout(*request_timeout),
                    ),
                    ReadinessConfig::Exec { command, expect } => {
                        if command.is_empty() {
                            return Err(Error::InvalidConfig(format!(
                                "service {}: exec readiness needs a command",
                                service.name
                            )));
                        }
                        Arc::new(ExecCheck::new(
                            controller.clone(),
                            service.name.clone(),
                            command.clone(),
                            expect.clone(),
                        ))
                    }
                    ReadinessConfig::Running => {
                        Arc::new(RunningCheck::new(controller.clone(), service.name.clone()))
                    }
                };

                Ok(ServiceSpec {
                    name: service.name.clone(),
                    readiness_check: check,
                    startup_timeout: service.startup_timeout,
                    required: service.required,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let plan = Self {
            project: config.project.clone(),
            services,
            backup: config.backup.clone(),
            migration: config.migrate.clone(),
            models: config.models.clone(),
            max_total_wait: config.max_total_wait,
            poll_interval: config.poll_interval,
            prereqs: Prerequisites::from_config(config),
        };
        plan.validate()?;
        Ok(plan)
    }

    pub fn with_backup(mut self, backup: BackupConfig) -> Self {
        self.backup = backup;
        self
    }

    pub fn with_migration(mut self, migration: MigrateConfig) -> Self {
        self.migration = Some(migration);
        self
    }

    pub fn with_models(mut self, models: Vec<ModelConfig>) -> Self {
        self.models = models;
        self
    }

    pub fn with_max_total_wait(mut self, wait: Duration) -> Self {
        self.max_total_wait = wait;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_prereqs(mut self, prereqs: Prerequisites) -> Self {
        self.prereqs = prereqs;
        self
    }

    pub fn service(&self, name: &ServiceName) -> Option<&ServiceSpec> {
        self.services.iter().find(|s| &s.name == name)
    }

    /// Structural checks that do not touch the outside world.
    pub fn validate(&self) -> Result<()> {
        if self.project.trim().is_empty() {
            return Err(Error::InvalidConfig("project name cannot be empty".to_string()));
        }

        if self.services.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one service is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for spec in &self.services {
            if !seen.insert(&spec.name) {
                return Err(Error::InvalidConfig(format!(
                    "duplicate service name: {}",
                    spec.name
                )));
            }
        }

        if self.max_total_wait.is_zero() {
            return Err(Error::InvalidConfig(
                "max_total_wait must be greater than zero".to_string(),
            ));
        }

        if let Some(migration) = &self.migration {
            if migration.command.is_empty() {
                return Err(Error::InvalidConfig(
                    "migration command cannot be empty".to_string(),
                ));
            }
            if let Some(db) = &migration.database
                && self.service(db).is_none()
            {
                return Err(Error::InvalidConfig(format!(
                    "migration database {db} is not a configured service"
                )));
            }
        }

        for model in &self.models {
            if model.name.trim().is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "model for service {} has an empty name",
                    model.service
                )));
            }
            if model.list_command.is_empty() || model.pull_command.is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "model {}: list and pull commands cannot be empty",
                    model.name
                )));
            }
            if self.service(&model.service).is_none() {
                return Err(Error::InvalidConfig(format!(
                    "model {} runs in {}, which is not a configured service",
                    model.name, model.service
                )));
            }
        }

        Ok(())
    }

    /// Advisory findings for a dry run; none of these block a deployment.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for spec in &self.services {
            if spec.startup_timeout > self.max_total_wait {
                warnings.push(format!(
                    "{}: startup_timeout {} exceeds max_total_wait {}",
                    spec.name,
                    humantime::format_duration(spec.startup_timeout),
                    humantime::format_duration(self.max_total_wait)
                ));
            }
            if spec.startup_timeout.is_zero() {
                warnings.push(format!("{}: startup_timeout is zero", spec.name));
            }
        }
        if let Some(migration) = &self.migration
            && let Some(db) = &migration.database
            && self.service(db).is_some_and(|s| !s.required)
        {
            warnings.push(format!(
                "migration depends on optional service {db}; a skipped {db} aborts the migration"
            ));
        }
        warnings
    }
}
