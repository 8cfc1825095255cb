// ABOUTME: Model provisioning configuration for the inference runtime.
// ABOUTME: Names a model that must be present in a runtime service after startup.

use serde::Deserialize;
use std::time::Duration;

use crate::types::ServiceName;

/// A model that should be present once `service` is ready.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelConfig {
    /// Runtime service the model lives in, e.g. `ollama`.
    pub service: ServiceName,

    /// Model reference, e.g. `deepseek-coder:6.7b`.
    pub name: String,

    /// Lists installed models; the first column holds model names.
    #[serde(default = "default_list_command")]
    pub list_command: Vec<String>,

    /// Pulls a model; the model name is appended.
    #[serde(default = "default_pull_command")]
    pub pull_command: Vec<String>,

    #[serde(default = "default_pull_timeout", with = "humantime_serde")]
    pub pull_timeout: Duration,

    /// Optional models only warn when they cannot be provisioned.
    #[serde(default)]
    pub required: bool,
}

impl ModelConfig {
    /// An optional model pulled with the Ollama CLI.
    pub fn new(service: ServiceName, name: impl Into<String>) -> Self {
        Self {
            service,
            name: name.into(),
            list_command: default_list_command(),
            pull_command: default_pull_command(),
            pull_timeout: default_pull_timeout(),
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

fn default_list_command() -> Vec<String> {
    vec!["ollama".to_string(), "list".to_string()]
}

fn default_pull_command() -> Vec<String> {
    vec!["ollama".to_string(), "pull".to_string()]
}

fn default_pull_timeout() -> Duration {
    Duration::from_secs(30 * 60)
}
