// ABOUTME: Healthcheck command implementation.
// ABOUTME: One check per configured service; exits non-zero unless everything is healthy.

use stackup::config::Config;
use stackup::deploy::DeploymentPlan;
use stackup::error::{Error, Result};
use stackup::health::{HealthReporter, Overall};
use stackup::output::Output;

use super::controller;

pub async fn healthcheck(config: Config, output: Output) -> Result<()> {
    let controller = controller(&config);
    let plan = DeploymentPlan::from_config(&config, controller.clone())?;

    let summary = HealthReporter::new(controller, config.check_timeout)
        .check_all(&plan.services)
        .await;
    output.health(&summary);

    match summary.overall {
        Overall::Healthy => Ok(()),
        overall => Err(Error::Unhealthy(overall)),
    }
}
