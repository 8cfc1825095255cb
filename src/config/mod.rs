// ABOUTME: Configuration types and parsing for stackup.yml.
// ABOUTME: Handles YAML parsing, discovery, duration fields and env var interpolation.

mod backup;
mod deserialize;
mod env_value;
mod init;
mod migrate;
mod model;
mod prereqs;
mod service;

pub use backup::{BackupConfig, ConfigBackupConfig, DatabaseBackupConfig, ModelBackupConfig};
pub use env_value::{EnvValue, resolve_env_map};
pub use init::init_config;
pub use migrate::MigrateConfig;
pub use model::ModelConfig;
pub use prereqs::PrereqConfig;
pub use service::{ReadinessConfig, ServiceConfig};

use crate::error::{Error, Result};
use crate::types::ServiceName;
use deserialize::deserialize_services;
use nonempty::NonEmpty;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "stackup.yml";
pub const CONFIG_FILENAME_ALT: &str = "stackup.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".stackup/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Compose project name; also names the deploy lock.
    pub project: String,

    #[serde(default = "default_compose_file")]
    pub compose_file: PathBuf,

    /// Command prefix used to reach Compose, e.g. `[docker, compose]`.
    #[serde(default = "default_compose_command")]
    pub compose_command: Vec<String>,

    /// Pull registry images before building.
    #[serde(default = "default_pull")]
    pub pull: bool,

    /// Directory holding the deploy lock.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Environment passed to Compose invocations.
    #[serde(default)]
    pub env: HashMap<String, EnvValue>,

    #[serde(default)]
    pub prereqs: PrereqConfig,

    #[serde(default = "default_max_total_wait", with = "humantime_serde")]
    pub max_total_wait: Duration,

    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Bound on each single check made by `healthcheck` and the verify stage.
    #[serde(default = "default_check_timeout", with = "humantime_serde")]
    pub check_timeout: Duration,

    #[serde(deserialize_with = "deserialize_services")]
    pub services: NonEmpty<ServiceConfig>,

    #[serde(default)]
    pub backup: BackupConfig,

    #[serde(default)]
    pub migrate: Option<MigrateConfig>,

    /// Models to provision once their runtime service is ready.
    #[serde(default)]
    pub models: Vec<ModelConfig>,
}

fn default_compose_file() -> PathBuf {
    PathBuf::from("docker-compose.yml")
}

fn default_compose_command() -> Vec<String> {
    vec!["docker".to_string(), "compose".to_string()]
}

fn default_pull() -> bool {
    true
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".stackup")
}

fn default_max_total_wait() -> Duration {
    Duration::from_secs(300)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_check_timeout() -> Duration {
    Duration::from_secs(5)
}

fn template_name(name: &str) -> Result<ServiceName> {
    ServiceName::new(name)
        .map_err(|e| Error::InvalidConfig(format!("template service {name}: {e}")))
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Look up a configured service by name.
    pub fn service(&self, name: &ServiceName) -> Option<&ServiceConfig> {
        self.services.iter().find(|s| &s.name == name)
    }

    /// Configuration for the default local LLM stack, used by `init`.
    pub fn template() -> Result<Self> {
        let service = |name: &str, required: bool, secs: u64, readiness: ReadinessConfig| {
            Ok::<_, Error>(ServiceConfig {
                name: template_name(name)?,
                required,
                startup_timeout: Duration::from_secs(secs),
                readiness,
            })
        };

        let services = NonEmpty::from((
            service(
                "postgres",
                true,
                60,
                ReadinessConfig::Exec {
                    command: vec!["pg_isready".to_string(), "-U".to_string(), "llm_user".to_string()],
                    expect: Some("accepting connections".to_string()),
                },
            )?,
            vec![
                service(
                    "redis",
                    true,
                    30,
                    ReadinessConfig::Exec {
                        command: vec!["redis-cli".to_string(), "ping".to_string()],
                        expect: Some("PONG".to_string()),
                    },
                )?,
                service(
                    "ollama",
                    true,
                    120,
                    ReadinessConfig::http("http://localhost:11434/api/tags"),
                )?,
                service(
                    "api",
                    true,
                    90,
                    ReadinessConfig::http("http://localhost:8000/health"),
                )?,
                service(
                    "prometheus",
                    false,
                    30,
                    ReadinessConfig::http("http://localhost:9090/-/ready"),
                )?,
            ],
        ));

        Ok(Config {
            project: "llm-platform".to_string(),
            compose_file: default_compose_file(),
            compose_command: default_compose_command(),
            pull: default_pull(),
            state_dir: default_state_dir(),
            env: HashMap::new(),
            prereqs: PrereqConfig::default(),
            max_total_wait: default_max_total_wait(),
            poll_interval: default_poll_interval(),
            check_timeout: default_check_timeout(),
            services,
            backup: BackupConfig {
                root: PathBuf::from("backups"),
                database: Some(DatabaseBackupConfig {
                    service: template_name("postgres")?,
                    command: vec![
                        "pg_dump".to_string(),
                        "-U".to_string(),
                        "llm_user".to_string(),
                        "llm_db".to_string(),
                    ],
                    required: true,
                }),
                models: Some(ModelBackupConfig {
                    path: PathBuf::from("data/models"),
                    required: false,
                }),
                config: Some(ConfigBackupConfig {
                    files: vec![PathBuf::from(".env"), default_compose_file()],
                    required: true,
                }),
            },
            migrate: Some(MigrateConfig {
                service: Some(template_name("api")?),
                database: Some(template_name("postgres")?),
                command: migrate::default_command(),
                target: migrate::default_target(),
            }),
            models: vec![ModelConfig::new(
                template_name("ollama")?,
                "deepseek-coder:6.7b",
            )],
        })
    }
}
