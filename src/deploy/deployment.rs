// ABOUTME: Generic deployment struct parameterized by state marker.
// ABOUTME: Carries the plan, the in-progress report and what earlier stages produced.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use crate::backup::Backup;
use crate::types::ServiceName;

use super::error::Aborted;
use super::plan::DeploymentPlan;
use super::report::{Outcome, ReportBuilder, StageFamily, StageStatus};
use super::state::Initialized;

/// A deployment in progress, parameterized by its current state.
///
/// Each transition consumes the deployment and returns either the next state
/// or [`Aborted`] with the finished report, so a stage can only run after
/// every stage before it succeeded.
///
/// ```no_run
/// # use stackup::deploy::{Built, Deployment, Provisioned, Verified};
/// # use stackup::migrate::Migrator;
/// # use stackup::runtime::{ContainerManager, ServiceController};
/// async fn start<M: ContainerManager>(d: Deployment<Built>, c: &ServiceController<M>) {
///     let _ = d.start(c).await;
/// }
/// async fn migrate<G: Migrator>(d: Deployment<Provisioned>, g: &G) {
///     let _ = d.migrate(g).await;
/// }
/// fn finish(d: Deployment<Verified>) {
///     let _ = d.finish();
/// }
/// ```
#[derive(Debug)]
pub struct Deployment<S> {
    pub(crate) plan: Arc<DeploymentPlan>,
    pub(crate) report: ReportBuilder,
    pub(crate) backup: Option<Backup>,
    pub(crate) ready: BTreeSet<ServiceName>,
    pub(crate) _state: S,
}

/// Result of a transition: the next state, or the aborted run.
pub type Transition<T> = Result<Deployment<T>, Aborted>;

impl Deployment<Initialized> {
    pub fn new(plan: Arc<DeploymentPlan>) -> Self {
        Deployment {
            plan,
            report: ReportBuilder::default(),
            backup: None,
            ready: BTreeSet::new(),
            _state: Initialized,
        }
    }
}

impl<S> Deployment<S> {
    pub fn plan(&self) -> &DeploymentPlan {
        &self.plan
    }

    /// Backup taken by this run, if any.
    pub fn taken_backup(&self) -> Option<&Backup> {
        self.backup.as_ref()
    }

    /// Services that passed readiness.
    pub fn ready_services(&self) -> &BTreeSet<ServiceName> {
        &self.ready
    }

    pub(crate) fn transition<T>(self, state: T) -> Deployment<T> {
        Deployment {
            plan: self.plan,
            report: self.report,
            backup: self.backup,
            ready: self.ready,
            _state: state,
        }
    }

    /// Record the failed stage and end the run.
    pub(crate) fn abort(
        mut self,
        family: StageFamily,
        stage: &str,
        error: impl std::fmt::Display,
        duration: Duration,
    ) -> Aborted {
        let error = error.to_string();
        self.report
            .record(stage, StageStatus::Failed, error.clone(), duration);
        self.abort_recorded(family, stage, error)
    }

    /// End the run when the failing stage is already in the report.
    pub(crate) fn abort_recorded(self, family: StageFamily, stage: &str, error: String) -> Aborted {
        if let Some(id) = self.report.backup_id() {
            tracing::warn!("deployment aborted; backup {} is available for manual recovery", id);
        }
        Aborted::new(self.report.finish(Outcome::Aborted {
            family,
            stage: stage.to_string(),
            error,
        }))
    }
}
