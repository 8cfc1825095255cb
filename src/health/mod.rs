// ABOUTME: Aggregate post-deployment health across all services.
// ABOUTME: One bounded check per service, run concurrently; used by deploy and the healthcheck command.

use futures::FutureExt;
use futures::future::join_all;
use serde::Serialize;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use crate::deploy::ServiceSpec;
use crate::runtime::{ContainerManager, ServiceController, ServiceStatus};
use crate::types::ServiceName;

/// Aggregate health of the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Overall {
    Healthy,
    /// Every required service is healthy; at least one optional one is not.
    Degraded,
    /// At least one required service is not healthy.
    Unhealthy,
}

impl Overall {
    /// Aggregate `(required, healthy)` pairs.
    pub fn from_services<I>(services: I) -> Self
    where
        I: IntoIterator<Item = (bool, bool)>,
    {
        let mut overall = Overall::Healthy;
        for (required, healthy) in services {
            match (required, healthy) {
                (_, true) => {}
                (true, false) => return Overall::Unhealthy,
                (false, false) => overall = Overall::Degraded,
            }
        }
        overall
    }

    /// Exit code for the healthcheck command.
    pub fn exit_code(self) -> i32 {
        match self {
            Overall::Healthy => 0,
            Overall::Degraded | Overall::Unhealthy => 6,
        }
    }
}

impl fmt::Display for Overall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Overall::Healthy => write!(f, "healthy"),
            Overall::Degraded => write!(f, "degraded"),
            Overall::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Health of one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceHealth {
    pub name: ServiceName,
    pub required: bool,
    pub status: ServiceStatus,
    pub healthy: bool,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthSummary {
    pub services: Vec<ServiceHealth>,
    pub overall: Overall,
}

impl HealthSummary {
    pub fn new(services: Vec<ServiceHealth>) -> Self {
        let overall = Overall::from_services(services.iter().map(|s| (s.required, s.healthy)));
        Self { services, overall }
    }

    /// Required services that are not healthy.
    pub fn unhealthy_required(&self) -> impl Iterator<Item = &ServiceHealth> {
        self.services.iter().filter(|s| s.required && !s.healthy)
    }

    /// Optional services that are not healthy.
    pub fn unhealthy_optional(&self) -> impl Iterator<Item = &ServiceHealth> {
        self.services.iter().filter(|s| !s.required && !s.healthy)
    }
}

impl fmt::Display for HealthSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .services
            .iter()
            .map(|s| s.name.as_str().len())
            .max()
            .unwrap_or(0)
            .max("SERVICE".len());

        writeln!(f, "  {:<width$}  {:<8}  {:<9}  DETAIL", "SERVICE", "STATUS", "HEALTH")?;
        for s in &self.services {
            let marker = if s.healthy { "✓" } else { "✗" };
            let health = match (s.healthy, s.required) {
                (true, _) => "healthy",
                (false, true) => "unhealthy",
                (false, false) => "degraded",
            };
            writeln!(
                f,
                "{} {:<width$}  {:<8}  {:<9}  {}",
                marker,
                s.name.as_str(),
                s.status.to_string(),
                health,
                s.detail
            )?;
        }
        writeln!(f)?;
        writeln!(f, "overall: {}", self.overall)
    }
}

/// Runs one non-blocking check per service.
pub struct HealthReporter<M> {
    controller: Arc<ServiceController<M>>,
    check_timeout: Duration,
}

impl<M: ContainerManager> HealthReporter<M> {
    pub fn new(controller: Arc<ServiceController<M>>, check_timeout: Duration) -> Self {
        Self {
            controller,
            check_timeout,
        }
    }

    /// Check every service once. Never fails; a check that errors or panics
    /// marks only that service unhealthy.
    pub async fn check_all(&self, specs: &[ServiceSpec]) -> HealthSummary {
        let services = join_all(specs.iter().map(|spec| self.check_one(spec))).await;
        let summary = HealthSummary::new(services);
        tracing::info!("health: {}", summary.overall);
        summary
    }

    async fn check_one(&self, spec: &ServiceSpec) -> ServiceHealth {
        let status = self.controller.status(&spec.name).await;
        let (healthy, detail) = if status != ServiceStatus::Up {
            (false, format!("service is {status}"))
        } else {
            let attempt = AssertUnwindSafe(spec.readiness_check.check()).catch_unwind();
            match tokio::time::timeout(self.check_timeout, attempt).await {
                Ok(Ok(Ok(()))) => (true, spec.readiness_check.describe()),
                Ok(Ok(Err(e))) => (false, e.to_string()),
                Ok(Err(_)) => (false, "readiness check panicked".to_string()),
                Err(_) => (
                    false,
                    format!(
                        "no response within {}",
                        humantime::format_duration(self.check_timeout)
                    ),
                ),
            }
        };

        if !healthy {
            if spec.required {
                tracing::warn!("{} unhealthy: {}", spec.name, detail);
            } else {
                tracing::warn!("optional service {} unhealthy: {}", spec.name, detail);
            }
        }

        ServiceHealth {
            name: spec.name.clone(),
            required: spec.required,
            status,
            healthy,
            detail,
        }
    }
}
