// ABOUTME: Error types owned by the orchestrator's own stages.
// ABOUTME: Prereq and verification failures, plus the Aborted carrier holding the final report.

use std::fmt;
use std::path::PathBuf;

use super::report::{DeploymentReport, Outcome, StageFamily};

/// One missing prerequisite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unmet {
    Tool(String),
    Credential(String),
    ComposeFile(PathBuf),
}

impl fmt::Display for Unmet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unmet::Tool(tool) => write!(f, "tool `{tool}` not found on PATH"),
            Unmet::Credential(var) => write!(f, "environment variable {var} is not set"),
            Unmet::ComposeFile(path) => write!(f, "compose file {} not found", path.display()),
        }
    }
}

/// Prerequisites are not satisfied; nothing has been touched.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unmet prerequisites: {}", join(.unmet))]
pub struct PrereqError {
    pub unmet: Vec<Unmet>,
}

/// Post-deployment verification found required services unhealthy.
#[derive(Debug, Clone, thiserror::Error)]
pub enum VerificationError {
    #[error("required service(s) unhealthy: {}", join(.services))]
    Unhealthy { services: Vec<String> },
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A run that ended before `Done`. Carries the finished report.
#[derive(Debug)]
pub struct Aborted {
    report: DeploymentReport,
}

impl Aborted {
    pub(crate) fn new(report: DeploymentReport) -> Self {
        Self { report }
    }

    pub fn report(&self) -> &DeploymentReport {
        &self.report
    }

    pub fn into_report(self) -> DeploymentReport {
        self.report
    }

    pub fn family(&self) -> Option<StageFamily> {
        match self.report.outcome() {
            Outcome::Aborted { family, .. } => Some(*family),
            _ => None,
        }
    }
}

impl fmt::Display for Aborted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "deployment {}", self.report.outcome())
    }
}

impl std::error::Error for Aborted {}
