// ABOUTME: State transition methods for deployment orchestration.
// ABOUTME: Each method consumes self and returns the next state or the aborted run.

use std::sync::atomic::{AtomicU32, Ordering};
use tokio::time::Instant;

use futures::future::join_all;

use crate::backup::{BackupError, BackupOps};
use crate::health::{HealthReporter, Overall};
use crate::migrate::{MigrationError, Migrator};
use crate::readiness::{ReadinessCheck, ReadinessTimeout, ReadySuccess, wait_until_ready};
use crate::provision::{ProvisionError, ensure_model};
use crate::runtime::{ContainerManager, ServiceController};

use super::deployment::{Deployment, Transition};
use super::error::{Aborted, VerificationError};
use super::report::{DeploymentReport, Outcome, StageFamily, StageStatus};
use super::state::{
    BackedUp, Built, Initialized, Migrated, PrereqsChecked, Provisioned, Ready, Started,
    Verified,
};

pub const STAGE_PREREQS: &str = "prereqs";
pub const STAGE_PLAN: &str = "plan";
pub const STAGE_BACKUP: &str = "backup";
pub const STAGE_BUILD: &str = "build";
pub const STAGE_START: &str = "start";
pub const STAGE_MIGRATE: &str = "migrate";
pub const STAGE_VERIFY: &str = "verify";

/// Stage name for one service's readiness wait.
pub fn ready_stage(service: &str) -> String {
    format!("ready:{service}")
}

/// Stage name for one model's provisioning.
pub fn model_stage(model: &str) -> String {
    format!("model:{model}")
}

impl<S> Deployment<S> {
    /// Appended to build and start failures so the operator knows where to look.
    fn recovery_hint(&self) -> String {
        match self.report.backup_id() {
            Some(id) => format!("services may be partially started; backup {id} is available for manual recovery"),
            None => "services may be partially started; no backup was taken".to_string(),
        }
    }
}

// =============================================================================
// Initialized -> PrereqsChecked
// =============================================================================

impl Deployment<Initialized> {
    /// Verify tools, credentials and the compose file.
    ///
    /// Nothing outside the plan's snapshot is touched, so a failure here
    /// guarantees no collaborator has been called.
    pub fn check_prereqs(mut self) -> Transition<PrereqsChecked> {
        let started = Instant::now();
        match self.plan.prereqs.check() {
            Ok(detail) => {
                self.report
                    .record(STAGE_PREREQS, StageStatus::Success, detail, started.elapsed());
                Ok(self.transition(PrereqsChecked))
            }
            Err(e) => Err(self.abort(StageFamily::Prereq, STAGE_PREREQS, e, started.elapsed())),
        }
    }
}

// =============================================================================
// PrereqsChecked -> BackedUp (or dry-run end)
// =============================================================================

impl Deployment<PrereqsChecked> {
    /// End a dry run: validate the plan and report its warnings without mutating anything.
    pub fn finish_dry_run(mut self) -> Result<DeploymentReport, Aborted> {
        let started = Instant::now();
        if let Err(e) = self.plan.validate() {
            return Err(self.abort(StageFamily::Prereq, STAGE_PLAN, e, started.elapsed()));
        }

        let warnings = self.plan.warnings();
        for warning in &warnings {
            tracing::warn!("{}", warning);
        }

        let detail = if warnings.is_empty() {
            format!("{} service(s) planned, nothing changed", self.plan.services.len())
        } else {
            format!("{} warning(s): {}", warnings.len(), warnings.join("; "))
        };
        self.report
            .record(STAGE_PLAN, StageStatus::Success, detail, started.elapsed());
        Ok(self.report.finish(Outcome::Validated))
    }

    /// Back up existing state before anything is mutated.
    ///
    /// Aborts if the backup failed outright or if any required part of it did.
    pub async fn backup<B: BackupOps + ?Sized>(mut self, backups: &B) -> Transition<BackedUp> {
        let started = Instant::now();
        let backup = match backups.create_backup(&self.plan.backup).await {
            Ok(backup) => backup,
            Err(e) => {
                return Err(self.abort(StageFamily::Backup, STAGE_BACKUP, e, started.elapsed()));
            }
        };

        self.report.set_backup(backup.id().clone());

        let required: Vec<_> = backup.required_failures().cloned().collect();
        if !required.is_empty() {
            let error = BackupError::RequiredFailed {
                id: backup.id().clone(),
                failures: required,
            };
            return Err(self.abort(StageFamily::Backup, STAGE_BACKUP, error, started.elapsed()));
        }

        let saved = backup
            .contents()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let mut detail = format!("backup {}: {}", backup.id(), saved);
        for failure in backup.failures() {
            tracing::warn!("optional {} not backed up: {}", failure.artifact, failure.error);
            detail.push_str(&format!("; {} failed (optional)", failure.artifact));
        }

        self.report
            .record(STAGE_BACKUP, StageStatus::Success, detail, started.elapsed());
        self.backup = Some(backup);
        Ok(self.transition(BackedUp))
    }

    /// Explicit opt-out: recorded as skipped, never silent.
    pub fn skip_backup(mut self) -> Deployment<BackedUp> {
        tracing::warn!("backup skipped by request; there is no recovery point for this run");
        self.report.record(
            STAGE_BACKUP,
            StageStatus::Skipped,
            "skipped by request (--skip-backup)",
            std::time::Duration::ZERO,
        );
        self.transition(BackedUp)
    }
}

// =============================================================================
// BackedUp -> Built -> Started
// =============================================================================

impl Deployment<BackedUp> {
    pub async fn build<M: ContainerManager>(
        mut self,
        controller: &ServiceController<M>,
    ) -> Transition<Built> {
        let started = Instant::now();
        match controller.build().await {
            Ok(()) => {
                self.report
                    .record(STAGE_BUILD, StageStatus::Success, "images built", started.elapsed());
                Ok(self.transition(Built))
            }
            Err(e) => {
                let error = format!("{e}; {}", self.recovery_hint());
                Err(self.abort(StageFamily::Service, STAGE_BUILD, error, started.elapsed()))
            }
        }
    }
}

impl Deployment<Built> {
    pub async fn start<M: ContainerManager>(
        mut self,
        controller: &ServiceController<M>,
    ) -> Transition<Started> {
        let started = Instant::now();
        match controller.start_all().await {
            Ok(()) => {
                self.report.record(
                    STAGE_START,
                    StageStatus::Success,
                    "services started",
                    started.elapsed(),
                );
                Ok(self.transition(Started))
            }
            Err(e) => {
                let error = format!("{e}; {}", self.recovery_hint());
                Err(self.abort(StageFamily::Service, STAGE_START, error, started.elapsed()))
            }
        }
    }
}

// =============================================================================
// Started -> Ready
// =============================================================================

/// How one service's readiness wait ended.
enum WaitOutcome {
    Ready(ReadySuccess),
    TimedOut(ReadinessTimeout),
    /// The global deadline passed first.
    Cancelled(ReadinessTimeout),
}

impl Deployment<Started> {
    /// Wait for every service concurrently.
    ///
    /// Each wait is bounded by its own startup timeout. Waits still running
    /// when `max_total_wait` expires are dropped and recorded as timeouts. Optional services that never become
    /// ready are recorded as skipped. Any required timeout aborts the run.
    pub async fn await_ready(mut self) -> Transition<Ready> {
        let plan = self.plan.clone();
        let started = Instant::now();
        let deadline = started + plan.max_total_wait;
        let attempts: Vec<AtomicU32> = plan.services.iter().map(|_| AtomicU32::new(0)).collect();

        let waits = plan.services.iter().zip(&attempts).map(|(spec, counter)| {
            let check: &dyn ReadinessCheck = spec.readiness_check.as_ref();
            // max_total_wait is enforced by the shared deadline below.
            let wait = wait_until_ready(
                move || {
                    counter.fetch_add(1, Ordering::Relaxed);
                    check.is_ready()
                },
                spec.startup_timeout,
                plan.poll_interval,
            );
            async move {
                tracing::debug!("waiting for {} ({})", spec.name, check.describe());
                match tokio::time::timeout_at(deadline, wait).await {
                    Ok(Ok(success)) => WaitOutcome::Ready(success),
                    Ok(Err(timeout)) => WaitOutcome::TimedOut(timeout),
                    Err(_) => WaitOutcome::Cancelled(ReadinessTimeout {
                        elapsed: started.elapsed(),
                        attempts: counter.load(Ordering::Relaxed),
                    }),
                }
            }
        });
        let outcomes = join_all(waits).await;

        let mut failed = Vec::new();
        for (spec, outcome) in plan.services.iter().zip(outcomes) {
            let stage = ready_stage(spec.name.as_str());
            let (timeout, suffix) = match outcome {
                WaitOutcome::Ready(success) => {
                    self.report.record(
                        stage,
                        StageStatus::Success,
                        format!("ready after {} attempt(s)", success.attempts),
                        success.elapsed,
                    );
                    self.ready.insert(spec.name.clone());
                    continue;
                }
                WaitOutcome::TimedOut(timeout) => (timeout, ""),
                WaitOutcome::Cancelled(timeout) => (timeout, " (max_total_wait reached)"),
            };

            let detail = format!("{timeout}{suffix}");
            if spec.required {
                failed.push((stage, detail, timeout.elapsed));
            } else {
                self.report.record(
                    stage,
                    StageStatus::Skipped,
                    format!("optional service not ready: {detail}"),
                    timeout.elapsed,
                );
            }
        }

        let Some((first, _, _)) = failed.first() else {
            return Ok(self.transition(Ready));
        };
        let first = first.clone();
        let error = failed
            .iter()
            .map(|(stage, detail, _)| format!("{stage} {detail}"))
            .collect::<Vec<_>>()
            .join("; ");
        for (stage, detail, elapsed) in failed {
            self.report.record(stage, StageStatus::Failed, detail, elapsed);
        }
        Err(self.abort_recorded(StageFamily::Service, &first, error))
    }
}

// =============================================================================
// Ready -> Provisioned
// =============================================================================

impl Deployment<Ready> {
    /// Make sure every configured model is present in its runtime service.
    ///
    /// Models are handled one at a time in config order. A model whose
    /// service did not pass readiness is never touched. Nothing is recorded
    /// when no models are configured.
    pub async fn provision_models<M: ContainerManager>(
        mut self,
        controller: &ServiceController<M>,
    ) -> Transition<Provisioned> {
        let plan = self.plan.clone();
        for model in &plan.models {
            let started = Instant::now();
            let stage = model_stage(&model.name);
            let result = if self.ready.contains(&model.service) {
                ensure_model(controller.manager(), model).await
            } else {
                Err(ProvisionError::RuntimeNotReady(model.service.to_string()))
            };

            match result {
                Ok(state) => {
                    self.report.record(
                        stage,
                        StageStatus::Success,
                        format!("{} {state}", model.name),
                        started.elapsed(),
                    );
                }
                Err(e) if !model.required => {
                    tracing::warn!("optional model {} not provisioned: {}", model.name, e);
                    self.report.record(
                        stage,
                        StageStatus::Skipped,
                        format!("optional model not provisioned: {e}"),
                        started.elapsed(),
                    );
                }
                Err(e) => {
                    return Err(self.abort(StageFamily::Service, &stage, e, started.elapsed()));
                }
            }
        }
        Ok(self.transition(Provisioned))
    }
}

// =============================================================================
// Provisioned -> Migrated -> Verified -> Done
// =============================================================================

impl Deployment<Provisioned> {
    /// Migrate the schema once. Skipped when no migration is configured.
    pub async fn migrate<G: Migrator + ?Sized>(mut self, migrator: &G) -> Transition<Migrated> {
        let started = Instant::now();
        let Some(migration) = self.plan.migration.clone() else {
            self.report.record(
                STAGE_MIGRATE,
                StageStatus::Skipped,
                "no migration configured",
                started.elapsed(),
            );
            return Ok(self.transition(Migrated));
        };

        if let Some(db) = &migration.database
            && !self.ready.contains(db)
        {
            let error = MigrationError::DatabaseNotReady(db.clone());
            return Err(self.abort(StageFamily::Migration, STAGE_MIGRATE, error, started.elapsed()));
        }

        match migrator.migrate_to_head().await {
            Ok(()) => {
                self.report.record(
                    STAGE_MIGRATE,
                    StageStatus::Success,
                    format!("migrated to {}", migration.target),
                    started.elapsed(),
                );
                Ok(self.transition(Migrated))
            }
            Err(e) => Err(self.abort(StageFamily::Migration, STAGE_MIGRATE, e, started.elapsed())),
        }
    }
}

impl Deployment<Migrated> {
    /// Aggregate health check. Degraded passes with a note; unhealthy aborts
    /// without touching the running services.
    pub async fn verify<M: ContainerManager>(
        mut self,
        health: &HealthReporter<M>,
    ) -> Transition<Verified> {
        let started = Instant::now();
        let summary = health.check_all(&self.plan.services).await;

        match summary.overall {
            Overall::Healthy => {
                self.report.record(
                    STAGE_VERIFY,
                    StageStatus::Success,
                    format!("all {} service(s) healthy", summary.services.len()),
                    started.elapsed(),
                );
                Ok(self.transition(Verified))
            }
            Overall::Degraded => {
                let names = summary
                    .unhealthy_optional()
                    .map(|s| s.name.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                self.report.record(
                    STAGE_VERIFY,
                    StageStatus::Success,
                    format!("degraded: optional service(s) unhealthy: {names}"),
                    started.elapsed(),
                );
                Ok(self.transition(Verified))
            }
            Overall::Unhealthy => {
                let error = VerificationError::Unhealthy {
                    services: summary
                        .unhealthy_required()
                        .map(|s| format!("{} ({})", s.name, s.detail))
                        .collect(),
                };
                Err(self.abort(StageFamily::Verification, STAGE_VERIFY, error, started.elapsed()))
            }
        }
    }
}

impl Deployment<Verified> {
    pub fn finish(self) -> DeploymentReport {
        tracing::info!("deployment of {} complete", self.plan.project);
        self.report.finish(Outcome::Done)
    }
}
