// ABOUTME: Readiness checks that go through the container manager.
// ABOUTME: ExecCheck runs a command in the container; RunningCheck asks for service status.

use async_trait::async_trait;
use std::sync::Arc;

use super::check::{CheckFailure, ReadinessCheck};
use crate::runtime::{ContainerManager, ServiceController, ServiceStatus};
use crate::types::ServiceName;

/// Run a command inside the service container, e.g. `redis-cli ping`.
///
/// Ready when the command exits 0 and, if `expect` is set, stdout contains it.
pub struct ExecCheck<M> {
    controller: Arc<ServiceController<M>>,
    service: ServiceName,
    command: Vec<String>,
    expect: Option<String>,
}

impl<M: ContainerManager> ExecCheck<M> {
    pub fn new(
        controller: Arc<ServiceController<M>>,
        service: ServiceName,
        command: Vec<String>,
        expect: Option<String>,
    ) -> Self {
        Self {
            controller,
            service,
            command,
            expect,
        }
    }
}

#[async_trait]
impl<M: ContainerManager> ReadinessCheck for ExecCheck<M> {
    async fn check(&self) -> Result<(), CheckFailure> {
        let output = self
            .controller
            .manager()
            .exec(&self.service, &self.command)
            .await
            .map_err(|e| CheckFailure::Manager(e.to_string()))?;

        if !output.success() {
            return Err(CheckFailure::CommandFailed {
                exit_code: output.exit_code,
            });
        }

        match &self.expect {
            Some(marker) if !output.stdout_text().contains(marker.as_str()) => {
                Err(CheckFailure::MissingMarker {
                    expected: marker.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    fn describe(&self) -> String {
        format!("exec {} `{}`", self.service, self.command.join(" "))
    }
}

/// Ready when the container manager reports the service as `Up`.
pub struct RunningCheck<M> {
    controller: Arc<ServiceController<M>>,
    service: ServiceName,
}

impl<M: ContainerManager> RunningCheck<M> {
    pub fn new(controller: Arc<ServiceController<M>>, service: ServiceName) -> Self {
        Self {
            controller,
            service,
        }
    }
}

#[async_trait]
impl<M: ContainerManager> ReadinessCheck for RunningCheck<M> {
    async fn check(&self) -> Result<(), CheckFailure> {
        match self.controller.status(&self.service).await {
            ServiceStatus::Up => Ok(()),
            other => Err(CheckFailure::NotRunning(other)),
        }
    }

    fn describe(&self) -> String {
        format!("status {}", self.service)
    }
}
