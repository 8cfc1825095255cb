// ABOUTME: Model provisioning for the inference runtime after it passes readiness.
// ABOUTME: Lists installed models inside the runtime container and pulls the missing one.

use std::fmt;

use crate::config::ModelConfig;
use crate::runtime::{ContainerManager, exit_status, trimmed};

/// How a model ended up present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    AlreadyPresent,
    Pulled,
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelState::AlreadyPresent => write!(f, "already present"),
            ModelState::Pulled => write!(f, "pulled"),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ProvisionError {
    #[error("listing models failed with {}: {}", exit_status(.exit_code), trimmed(.stderr))]
    ListFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("pulling {model} failed with {}: {}", exit_status(.exit_code), trimmed(.stderr))]
    PullFailed {
        model: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("pulling {model} did not finish within {}", human(.timeout))]
    PullTimedOut {
        model: String,
        timeout: std::time::Duration,
    },

    #[error("container manager unavailable: {0}")]
    Unavailable(String),

    #[error("runtime service {0} did not pass readiness")]
    RuntimeNotReady(String),
}

fn human(duration: &std::time::Duration) -> humantime::FormattedDuration {
    humantime::format_duration(*duration)
}

/// Whether `name` appears in the first column of a model listing.
///
/// An untagged name also matches its `:latest` entry.
pub fn lists_model(listing: &str, name: &str) -> bool {
    let latest = (!name.contains(':')).then(|| format!("{name}:latest"));
    listing
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .any(|first| first == name || latest.as_deref() == Some(first))
}

/// Make sure `model` is installed in its runtime service, pulling it if needed.
pub async fn ensure_model<M: ContainerManager>(
    manager: &M,
    model: &ModelConfig,
) -> Result<ModelState, ProvisionError> {
    let listing = manager
        .exec(&model.service, &model.list_command)
        .await
        .map_err(|e| ProvisionError::Unavailable(e.to_string()))?;

    if !listing.success() {
        return Err(ProvisionError::ListFailed {
            exit_code: listing.exit_code,
            stderr: listing.stderr,
        });
    }

    if lists_model(&listing.stdout_text(), &model.name) {
        tracing::info!("model {} already present in {}", model.name, model.service);
        return Ok(ModelState::AlreadyPresent);
    }

    tracing::info!("pulling model {} into {}", model.name, model.service);
    let mut pull = model.pull_command.clone();
    pull.push(model.name.clone());

    let output = tokio::time::timeout(model.pull_timeout, manager.exec(&model.service, &pull))
        .await
        .map_err(|_| ProvisionError::PullTimedOut {
            model: model.name.clone(),
            timeout: model.pull_timeout,
        })?
        .map_err(|e| ProvisionError::Unavailable(e.to_string()))?;

    if output.success() {
        Ok(ModelState::Pulled)
    } else {
        Err(ProvisionError::PullFailed {
            model: model.name.clone(),
            exit_code: output.exit_code,
            stderr: output.stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "NAME                  ID              SIZE      MODIFIED\n\
                           deepseek-coder:6.7b   ce298d984115    3.8 GB    2 days ago\n\
                           llama3:latest         365c0bd3c000    4.7 GB    3 weeks ago\n";

    #[test]
    fn tagged_name_matches_exactly() {
        assert!(lists_model(LISTING, "deepseek-coder:6.7b"));
        assert!(!lists_model(LISTING, "deepseek-coder:33b"));
    }

    #[test]
    fn untagged_name_matches_latest() {
        assert!(lists_model(LISTING, "llama3"));
        assert!(!lists_model(LISTING, "deepseek-coder"));
    }

    #[test]
    fn header_is_not_a_model() {
        assert!(!lists_model(LISTING, "NAME:latest"));
        assert!(!lists_model("", "llama3"));
    }
}
