// ABOUTME: Backup command implementation.
// ABOUTME: Takes a standalone backup under the deploy lock and prints its identifier.

use stackup::backup::{BackupError, BackupManager, BackupOps};
use stackup::config::Config;
use stackup::deploy::DeployLock;
use stackup::error::Result;
use stackup::output::Output;

use super::controller;

pub async fn backup(config: Config, mut output: Output) -> Result<()> {
    output.start_timer();
    let manager = BackupManager::new(controller(&config));

    output.progress(&format!("Backing up {}", config.project));
    let backup = DeployLock::with_lock(
        &config.state_dir,
        &config.project,
        false,
        manager.create_backup(&config.backup),
    )
    .await??;

    for failure in backup.failures() {
        output.warning(&format!("{} failed: {}", failure.artifact, failure.error));
    }

    let required: Vec<_> = backup.required_failures().cloned().collect();
    if !required.is_empty() {
        return Err(BackupError::RequiredFailed {
            id: backup.id().clone(),
            failures: required,
        }
        .into());
    }

    output.success(&format!(
        "Backup {} created at {}",
        backup.id(),
        backup.path().display()
    ));
    Ok(())
}
