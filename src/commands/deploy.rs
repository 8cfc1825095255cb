// ABOUTME: Deploy command implementation.
// ABOUTME: Wires the Compose backend into the orchestrator and runs it under the deploy lock.

use std::sync::Arc;
use std::time::Duration;

use stackup::backup::BackupManager;
use stackup::config::Config;
use stackup::deploy::{DeployLock, DeploymentPlan, Orchestrator, Outcome, RunOptions};
use stackup::diagnostics::{Diagnostics, Warning};
use stackup::error::{Error, Result};
use stackup::migrate::MigrationRunner;
use stackup::output::Output;

use super::{controller, resolved_env};

#[derive(Debug, Clone, Copy, Default)]
pub struct DeployOptions {
    pub timeout: Option<Duration>,
    pub skip_backup: bool,
    pub dry_run: bool,
    pub force: bool,
}

pub async fn deploy(mut config: Config, options: DeployOptions, mut output: Output) -> Result<()> {
    output.start_timer();
    let mut diag = Diagnostics::default();

    if let Some(timeout) = options.timeout {
        config.max_total_wait = timeout;
    }

    let controller = controller(&config);
    let plan = Arc::new(DeploymentPlan::from_config(&config, controller.clone())?);

    if !options.dry_run {
        for warning in plan.warnings() {
            diag.warn(Warning::plan(warning));
        }
    }
    if options.skip_backup && !options.dry_run {
        diag.warn(Warning::backup_skipped(
            "deploying without a backup (--skip-backup)",
        ));
    }

    let migrator = MigrationRunner::new(
        controller.clone(),
        &config.migrate.clone().unwrap_or_default(),
    )
    .with_env(resolved_env(&config));

    let orchestrator = Orchestrator::new(
        plan,
        controller.clone(),
        BackupManager::new(controller),
        migrator,
        config.check_timeout,
    );

    let run_options = RunOptions {
        skip_backup: options.skip_backup,
        dry_run: options.dry_run,
    };

    let report = if options.dry_run {
        output.progress(&format!("Validating deployment of {}", config.project));
        orchestrator.run(run_options).await
    } else {
        output.progress(&format!(
            "Deploying {} ({} service(s))",
            config.project,
            config.services.len()
        ));
        let lock = DeployLock::acquire(&config.state_dir, &config.project, options.force).await?;
        let report = orchestrator.run(run_options).await;
        if let Err(e) = lock.release().await {
            diag.warn(Warning::lock_release(e.to_string()));
        }
        report
    };

    output.report(&report);
    output.diagnostics(&diag);

    match report.outcome() {
        Outcome::Done => {
            output.success("Deployment complete!");
            Ok(())
        }
        Outcome::Validated => {
            output.success("Plan validated, nothing changed");
            Ok(())
        }
        Outcome::Aborted { family, stage, .. } => Err(Error::Aborted {
            family: *family,
            stage: stage.clone(),
        }),
    }
}
