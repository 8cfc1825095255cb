// ABOUTME: Prerequisite configuration: external tools and credentials.
// ABOUTME: Checked before anything is backed up or mutated.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct PrereqConfig {
    /// Executables that must be on the PATH.
    #[serde(default = "default_tools")]
    pub tools: Vec<String>,

    /// Environment variables that must be set (credentials, secrets).
    #[serde(default)]
    pub env: Vec<String>,
}

impl Default for PrereqConfig {
    fn default() -> Self {
        Self {
            tools: default_tools(),
            env: Vec::new(),
        }
    }
}

fn default_tools() -> Vec<String> {
    vec!["docker".to_string()]
}
