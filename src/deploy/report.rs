// ABOUTME: Stage results and the deployment report, the orchestrator's only output.
// ABOUTME: The report is appended to during a run and immutable once finished.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::types::BackupId;

/// Outcome of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Success,
    Failed,
    Skipped,
}

impl StageStatus {
    fn marker(self) -> &'static str {
        match self {
            StageStatus::Success => "✓",
            StageStatus::Failed => "✗",
            StageStatus::Skipped => "-",
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageStatus::Success => write!(f, "success"),
            StageStatus::Failed => write!(f, "failed"),
            StageStatus::Skipped => write!(f, "skipped"),
        }
    }
}

impl FromStr for StageStatus {
    type Err = ParseReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(StageStatus::Success),
            "failed" => Ok(StageStatus::Failed),
            "skipped" => Ok(StageStatus::Skipped),
            other => Err(ParseReportError::UnknownStatus(other.to_string())),
        }
    }
}

/// Result of one pipeline stage (or one service's readiness wait).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: String,
    pub status: StageStatus,
    pub detail: String,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

/// Groups of stages that share an exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageFamily {
    Prereq,
    Backup,
    /// Build, start and readiness.
    Service,
    Migration,
    Verification,
}

impl StageFamily {
    /// Process exit code for a run aborted in this family.
    pub fn exit_code(self) -> i32 {
        match self {
            StageFamily::Prereq => 2,
            StageFamily::Backup => 3,
            StageFamily::Service => 4,
            StageFamily::Migration => 5,
            StageFamily::Verification => 6,
        }
    }
}

impl fmt::Display for StageFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageFamily::Prereq => write!(f, "prereq"),
            StageFamily::Backup => write!(f, "backup"),
            StageFamily::Service => write!(f, "service"),
            StageFamily::Migration => write!(f, "migration"),
            StageFamily::Verification => write!(f, "verification"),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Outcome {
    /// Every required stage succeeded.
    Done,
    /// Dry run: prerequisites and plan checked, nothing mutated.
    Validated,
    Aborted {
        family: StageFamily,
        stage: String,
        error: String,
    },
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Done | Outcome::Validated => 0,
            Outcome::Aborted { family, .. } => family.exit_code(),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Done => write!(f, "done"),
            Outcome::Validated => write!(f, "validated (dry run)"),
            Outcome::Aborted {
                family,
                stage,
                error,
            } => write!(f, "aborted ({family}) at {stage}: {error}"),
        }
    }
}

/// Ordered stage results of one run plus its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentReport {
    stages: Vec<StageResult>,
    outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    backup_id: Option<BackupId>,
}

impl DeploymentReport {
    pub fn stages(&self) -> &[StageResult] {
        &self.stages
    }

    pub fn stage(&self, name: &str) -> Option<&StageResult> {
        self.stages.iter().find(|s| s.stage == name)
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Backup taken during this run, named for manual recovery.
    pub fn backup_id(&self) -> Option<&BackupId> {
        self.backup_id.as_ref()
    }

    pub fn is_success(&self) -> bool {
        !matches!(self.outcome, Outcome::Aborted { .. })
    }

    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }

    /// Stage names and statuses recovered from [`fmt::Display`] output.
    pub fn parse_stages(text: &str) -> Result<Vec<(String, StageStatus)>, ParseReportError> {
        let mut lines = text.lines();
        match lines.next() {
            Some(header) if header.split_whitespace().next() == Some("STAGE") => {}
            _ => return Err(ParseReportError::MissingHeader),
        }

        let mut stages = Vec::new();
        for line in lines {
            if line.trim().is_empty() {
                break;
            }
            let mut fields = line.split_whitespace();
            let _marker = fields.next();
            let stage = fields
                .next()
                .ok_or_else(|| ParseReportError::Malformed(line.to_string()))?;
            let status = fields
                .next()
                .ok_or_else(|| ParseReportError::Malformed(line.to_string()))?
                .parse()?;
            stages.push((stage.to_string(), status));
        }
        Ok(stages)
    }
}

impl fmt::Display for DeploymentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .stages
            .iter()
            .map(|s| s.stage.len())
            .max()
            .unwrap_or(0)
            .max("STAGE".len());

        writeln!(f, "  {:<width$}  {:<8}  {:>8}  DETAIL", "STAGE", "STATUS", "DURATION")?;
        for s in &self.stages {
            writeln!(
                f,
                "{} {:<width$}  {:<8}  {:>7.1}s  {}",
                s.status.marker(),
                s.stage,
                s.status.to_string(),
                s.duration.as_secs_f64(),
                single_line(&s.detail)
            )?;
        }
        writeln!(f)?;
        writeln!(f, "outcome: {}", self.outcome)?;
        if let Some(id) = &self.backup_id {
            writeln!(f, "backup: {id}")?;
        }
        Ok(())
    }
}

/// Details often carry captured stderr; newlines are escaped so every stage
/// stays on its own line.
fn single_line(detail: &str) -> String {
    detail.trim_end().replace("\r\n", "\n").replace('\n', "\\n")
}

#[derive(Debug, thiserror::Error)]
pub enum ParseReportError {
    #[error("report header not found")]
    MissingHeader,

    #[error("malformed stage line: {0:?}")]
    Malformed(String),

    #[error("unknown stage status: {0}")]
    UnknownStatus(String),
}

/// Append-only accumulator used while a run is in progress.
#[derive(Debug, Default)]
pub(crate) struct ReportBuilder {
    stages: Vec<StageResult>,
    backup_id: Option<BackupId>,
}

impl ReportBuilder {
    pub(crate) fn record(
        &mut self,
        stage: impl Into<String>,
        status: StageStatus,
        detail: impl Into<String>,
        duration: Duration,
    ) {
        let result = StageResult {
            stage: stage.into(),
            status,
            detail: detail.into(),
            duration,
        };
        match status {
            StageStatus::Success => tracing::info!("{}: {}", result.stage, result.detail),
            StageStatus::Skipped => tracing::warn!("{} skipped: {}", result.stage, result.detail),
            StageStatus::Failed => tracing::error!("{} failed: {}", result.stage, result.detail),
        }
        self.stages.push(result);
    }

    pub(crate) fn set_backup(&mut self, id: BackupId) {
        self.backup_id = Some(id);
    }

    pub(crate) fn backup_id(&self) -> Option<&BackupId> {
        self.backup_id.as_ref()
    }

    pub(crate) fn finish(self, outcome: Outcome) -> DeploymentReport {
        DeploymentReport {
            stages: self.stages,
            outcome,
            backup_id: self.backup_id,
        }
    }
}
