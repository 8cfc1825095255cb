// ABOUTME: Deployment state marker types for the type state pattern.
// ABOUTME: Zero-sized types enforce the stage order at compile time.

/// Initial state: plan loaded, nothing checked.
/// Available actions: `check_prereqs()`
///
/// Later stages are not reachable from here:
///
/// ```compile_fail
/// # use std::sync::Arc;
/// # use stackup::deploy::{Deployment, DeploymentPlan};
/// # use stackup::migrate::Migrator;
/// async fn migrate_first<G: Migrator>(plan: Arc<DeploymentPlan>, g: &G) {
///     let _ = Deployment::new(plan).migrate(g).await;
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Initialized;

/// Prerequisites satisfied.
/// Available actions: `backup()`, `skip_backup()`, `finish_dry_run()`
#[derive(Debug, Clone, Copy, Default)]
pub struct PrereqsChecked;

/// Existing state backed up (or backup explicitly skipped).
/// Available actions: `build()`
///
/// Services cannot start before their images are built:
///
/// ```compile_fail
/// # use stackup::deploy::{BackedUp, Deployment};
/// # use stackup::runtime::{ContainerManager, ServiceController};
/// async fn start_unbuilt<M: ContainerManager>(d: Deployment<BackedUp>, c: &ServiceController<M>) {
///     let _ = d.start(c).await;
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct BackedUp;

/// Images pulled and built.
/// Available actions: `start()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Built;

/// Services started.
/// Available actions: `await_ready()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Started;

/// Every required service passed readiness.
/// Available actions: `provision_models()`
///
/// Migrating straight from readiness does not compile:
///
/// ```compile_fail
/// # use stackup::deploy::{Deployment, Ready, Transition, Migrated};
/// # use stackup::migrate::Migrator;
/// async fn skip_models<G: Migrator>(d: Deployment<Ready>, g: &G) -> Transition<Migrated> {
///     d.migrate(g).await
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Ready;

/// Configured models present in their runtime services.
/// Available actions: `migrate()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Provisioned;

/// Schema at the target revision (or no migration configured).
/// Available actions: `verify()`
///
/// A run cannot finish without verification:
///
/// ```compile_fail
/// # use stackup::deploy::{Deployment, Migrated};
/// fn finish_unverified(d: Deployment<Migrated>) {
///     let _ = d.finish();
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Migrated;

/// Aggregate health verified.
/// Available actions: `finish()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Verified;
