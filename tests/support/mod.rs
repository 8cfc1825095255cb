// ABOUTME: Test support utilities.
// ABOUTME: Provides tracing setup plus scripted collaborators with a shared call log.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use stackup::backup::{Backup, BackupError, BackupManager, BackupOps};
use stackup::config::BackupConfig;
use stackup::deploy::ServiceSpec;
use stackup::migrate::{MigrationError, Migrator};
use stackup::readiness::{CheckFailure, ReadinessCheck};
use stackup::runtime::{ContainerManager, ExecOutput, ManagerError, ServiceController};
use stackup::types::ServiceName;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("stackup=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn name(s: &str) -> ServiceName {
    ServiceName::new(s).unwrap()
}

/// Ordered record of collaborator calls, shared by every mock in a test.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn record(&self, call: impl Into<String>) {
        self.0.lock().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.0.lock().iter().filter(|c| c.as_str() == call).count()
    }
}

/// Container manager that never spawns anything.
#[derive(Default)]
pub struct MockManager {
    pub log: CallLog,
    pub fail_build: bool,
    pub fail_up: bool,
    /// Services reported as exited by `status`.
    pub down: HashSet<String>,
    /// Per-service exec result; services not listed succeed with empty output.
    pub exec: HashMap<String, ExecOutput>,
    /// Exec result for one exact command, keyed `service:command`.
    pub exec_commands: HashMap<String, ExecOutput>,
}

impl MockManager {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            ..Default::default()
        }
    }

    pub fn with_exec(mut self, service: &str, output: ExecOutput) -> Self {
        self.exec.insert(service.to_string(), output);
        self
    }

    pub fn with_exec_command(mut self, service: &str, command: &str, output: ExecOutput) -> Self {
        self.exec_commands
            .insert(format!("{service}:{command}"), output);
        self
    }

    pub fn into_controller(self) -> Arc<ServiceController<MockManager>> {
        Arc::new(ServiceController::new(self))
    }

    fn failed(&self, command: &str) -> ManagerError {
        ManagerError::Failed {
            command: format!("docker compose {command}"),
            exit_code: Some(1),
            stderr: format!("{command} exploded"),
        }
    }
}

#[async_trait]
impl ContainerManager for MockManager {
    async fn pull(&self) -> Result<(), ManagerError> {
        self.log.record("pull");
        Ok(())
    }

    async fn build(&self) -> Result<(), ManagerError> {
        self.log.record("build");
        if self.fail_build {
            return Err(self.failed("build"));
        }
        Ok(())
    }

    async fn up(&self) -> Result<(), ManagerError> {
        self.log.record("up");
        if self.fail_up {
            return Err(self.failed("up"));
        }
        Ok(())
    }

    async fn status(&self, service: &ServiceName) -> Result<String, ManagerError> {
        self.log.record(format!("status:{service}"));
        if self.down.contains(service.as_str()) {
            Ok(format!("NAME STATUS\nllm-{service}-1 exited\n"))
        } else {
            Ok(format!("NAME STATUS\nllm-{service}-1 running\n"))
        }
    }

    async fn exec(
        &self,
        service: &ServiceName,
        command: &[String],
    ) -> Result<ExecOutput, ManagerError> {
        let key = format!("{service}:{}", command.join(" "));
        self.log.record(format!("exec:{key}"));
        Ok(self
            .exec_commands
            .get(&key)
            .or_else(|| self.exec.get(service.as_str()))
            .cloned()
            .unwrap_or(ExecOutput {
                exit_code: Some(0),
                stdout: Vec::new(),
                stderr: String::new(),
            }))
    }
}

pub fn exec_ok(stdout: &str) -> ExecOutput {
    ExecOutput {
        exit_code: Some(0),
        stdout: stdout.as_bytes().to_vec(),
        stderr: String::new(),
    }
}

pub fn exec_failed(stderr: &str) -> ExecOutput {
    ExecOutput {
        exit_code: Some(2),
        stdout: Vec::new(),
        stderr: stderr.to_string(),
    }
}

/// Readiness check that turns ready a fixed time after creation.
pub struct ScriptedCheck {
    ready_after: Option<Duration>,
    created: Instant,
    calls: AtomicU32,
    panics: bool,
    hangs: bool,
}

impl ScriptedCheck {
    pub fn after(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            ready_after: Some(delay),
            created: Instant::now(),
            calls: AtomicU32::new(0),
            panics: false,
            hangs: false,
        })
    }

    pub fn immediately() -> Arc<Self> {
        Self::after(Duration::ZERO)
    }

    pub fn never() -> Arc<Self> {
        Arc::new(Self {
            ready_after: None,
            created: Instant::now(),
            calls: AtomicU32::new(0),
            panics: false,
            hangs: false,
        })
    }

    pub fn panicking() -> Arc<Self> {
        Arc::new(Self {
            ready_after: None,
            created: Instant::now(),
            calls: AtomicU32::new(0),
            panics: true,
            hangs: false,
        })
    }

    /// Never answers at all.
    pub fn hanging() -> Arc<Self> {
        Arc::new(Self {
            ready_after: None,
            created: Instant::now(),
            calls: AtomicU32::new(0),
            panics: false,
            hangs: true,
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReadinessCheck for ScriptedCheck {
    async fn check(&self) -> Result<(), CheckFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panics {
            panic!("scripted check panicked");
        }
        if self.hangs {
            std::future::pending::<()>().await;
        }
        match self.ready_after {
            Some(delay) if self.created.elapsed() >= delay => Ok(()),
            _ => Err(CheckFailure::Connection("connection refused".to_string())),
        }
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

pub fn spec(service: &str, check: Arc<ScriptedCheck>, timeout: Duration) -> ServiceSpec {
    ServiceSpec::new(name(service), check, timeout)
}

/// Real backup manager that logs each call first.
pub struct CountingBackups {
    pub log: CallLog,
    pub inner: BackupManager<MockManager>,
}

impl CountingBackups {
    pub fn new(log: CallLog, controller: Arc<ServiceController<MockManager>>) -> Self {
        Self {
            log,
            inner: BackupManager::new(controller),
        }
    }
}

#[async_trait]
impl BackupOps for CountingBackups {
    async fn create_backup(&self, plan: &BackupConfig) -> Result<Backup, BackupError> {
        self.log.record("backup");
        self.inner.create_backup(plan).await
    }
}

pub struct MockMigrator {
    pub log: CallLog,
    pub fail: bool,
}

impl MockMigrator {
    pub fn new(log: CallLog) -> Self {
        Self { log, fail: false }
    }

    pub fn failing(log: CallLog) -> Self {
        Self { log, fail: true }
    }
}

#[async_trait]
impl Migrator for MockMigrator {
    async fn migrate_to_head(&self) -> Result<(), MigrationError> {
        self.log.record("migrate");
        if self.fail {
            return Err(MigrationError::Failed {
                exit_code: Some(1),
                stderr: "Can't locate revision".to_string(),
            });
        }
        Ok(())
    }
}
