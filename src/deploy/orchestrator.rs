// ABOUTME: Drives one deployment through every stage in order.
// ABOUTME: Owns the collaborators; the typestate transitions decide what runs next.

use std::sync::Arc;
use std::time::Duration;

use crate::backup::BackupOps;
use crate::health::HealthReporter;
use crate::migrate::Migrator;
use crate::runtime::{ContainerManager, ServiceController};

use super::deployment::Deployment;
use super::error::Aborted;
use super::plan::DeploymentPlan;
use super::report::DeploymentReport;

/// Per-invocation switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Record the backup stage as skipped instead of taking one.
    pub skip_backup: bool,
    /// Check prerequisites and the plan, then stop.
    pub dry_run: bool,
}

pub struct Orchestrator<M, B, G> {
    plan: Arc<DeploymentPlan>,
    controller: Arc<ServiceController<M>>,
    backups: B,
    migrator: G,
    health: HealthReporter<M>,
}

impl<M, B, G> Orchestrator<M, B, G>
where
    M: ContainerManager,
    B: BackupOps,
    G: Migrator,
{
    pub fn new(
        plan: Arc<DeploymentPlan>,
        controller: Arc<ServiceController<M>>,
        backups: B,
        migrator: G,
        check_timeout: Duration,
    ) -> Self {
        let health = HealthReporter::new(controller.clone(), check_timeout);
        Self {
            plan,
            controller,
            backups,
            migrator,
            health,
        }
    }

    pub fn plan(&self) -> &DeploymentPlan {
        &self.plan
    }

    /// Run the pipeline to `Done`, `Validated` or the first abort.
    pub async fn run(&self, options: RunOptions) -> DeploymentReport {
        tracing::info!(
            "deploying {} ({} service(s))",
            self.plan.project,
            self.plan.services.len()
        );
        match self.try_run(options).await {
            Ok(report) => report,
            Err(aborted) => {
                tracing::error!("{}", aborted);
                aborted.into_report()
            }
        }
    }

    async fn try_run(&self, options: RunOptions) -> Result<DeploymentReport, Aborted> {
        let deployment = Deployment::new(self.plan.clone()).check_prereqs()?;

        if options.dry_run {
            return deployment.finish_dry_run();
        }

        let deployment = if options.skip_backup {
            deployment.skip_backup()
        } else {
            deployment.backup(&self.backups).await?
        };

        let deployment = deployment
            .build(&self.controller)
            .await?
            .start(&self.controller)
            .await?
            .await_ready()
            .await?
            .provision_models(&self.controller)
            .await?
            .migrate(&self.migrator)
            .await?
            .verify(&self.health)
            .await?;

        Ok(deployment.finish())
    }
}
