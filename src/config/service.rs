// ABOUTME: Per-service configuration: required flag, startup timeout and readiness check.
// ABOUTME: Readiness is an internally tagged enum: http, exec or running.

use serde::Deserialize;
use std::time::Duration;

use crate::types::ServiceName;

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: ServiceName,

    /// Optional services only degrade the deployment when they fail.
    #[serde(default = "default_required")]
    pub required: bool,

    #[serde(default = "default_startup_timeout", with = "humantime_serde")]
    pub startup_timeout: Duration,

    #[serde(default)]
    pub readiness: ReadinessConfig,
}

fn default_required() -> bool {
    true
}

fn default_startup_timeout() -> Duration {
    Duration::from_secs(60)
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReadinessConfig {
    /// `GET url` answers with `status`.
    Http {
        url: String,
        #[serde(default = "default_status")]
        status: u16,
        #[serde(default = "default_request_timeout", with = "humantime_serde")]
        request_timeout: Duration,
    },
    /// Command run inside the container exits 0 and prints `expect`.
    Exec {
        command: Vec<String>,
        #[serde(default)]
        expect: Option<String>,
    },
    /// The container manager reports the service as up.
    #[default]
    Running,
}

impl ReadinessConfig {
    pub fn http(url: &str) -> Self {
        ReadinessConfig::Http {
            url: url.to_string(),
            status: default_status(),
            request_timeout: default_request_timeout(),
        }
    }
}

fn default_status() -> u16 {
    200
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(5)
}
