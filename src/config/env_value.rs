// ABOUTME: Environment values for Compose invocations, literal or read from the environment.
// ABOUTME: Unresolvable references are collected so the prereq stage can report them together.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    pub fn resolve(&self) -> Result<String> {
        match self {
            EnvValue::Literal(s) => Ok(s.clone()),
            EnvValue::FromEnv { var, default } => match std::env::var(var) {
                Ok(val) => Ok(val),
                Err(_) => default
                    .clone()
                    .ok_or_else(|| Error::MissingEnvVar(var.clone())),
            },
        }
    }
}

/// Resolve every value, returning the resolved map and the sorted names of
/// environment variables that were referenced but unset.
pub fn resolve_env_map(map: &HashMap<String, EnvValue>) -> (BTreeMap<String, String>, Vec<String>) {
    let mut resolved = BTreeMap::new();
    let mut missing = Vec::new();

    for (key, value) in map {
        match value.resolve() {
            Ok(v) => {
                resolved.insert(key.clone(), v);
            }
            Err(Error::MissingEnvVar(var)) => missing.push(var),
            Err(_) => {}
        }
    }

    missing.sort();
    missing.dedup();
    (resolved, missing)
}
