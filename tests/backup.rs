// ABOUTME: Integration tests for backup creation.
// ABOUTME: Covers identifier collisions, partial and total failure, and the manifest.

mod support;

use proptest::prelude::*;
use stackup::backup::{
    Artifact, BackupError, BackupManager, BackupOps, CONFIG_DIRNAME, DATABASE_DUMP_FILENAME,
    MODEL_ARCHIVE_FILENAME,
};
use stackup::config::{BackupConfig, ConfigBackupConfig, DatabaseBackupConfig, ModelBackupConfig};
use stackup::types::{BackupId, BackupIdGenerator};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use support::{CallLog, MockManager, exec_failed, exec_ok, name};

fn manager(db: stackup::runtime::ExecOutput) -> BackupManager<MockManager> {
    BackupManager::new(MockManager::new(CallLog::default()).with_exec("postgres", db).into_controller())
}

fn full_plan(root: &Path, work: &Path) -> BackupConfig {
    let models = work.join("models");
    fs::create_dir_all(&models).unwrap();
    fs::write(models.join("llama.gguf"), vec![1u8; 64]).unwrap();
    let env = work.join(".env");
    fs::write(&env, "POSTGRES_DB=llm\n").unwrap();

    BackupConfig {
        root: root.to_path_buf(),
        database: Some(DatabaseBackupConfig {
            service: name("postgres"),
            command: vec!["pg_dump".to_string(), "-U".to_string(), "llm".to_string()],
            required: true,
        }),
        models: Some(ModelBackupConfig {
            path: models,
            required: false,
        }),
        config: Some(ConfigBackupConfig {
            files: vec![env],
            required: true,
        }),
    }
}

#[tokio::test]
async fn complete_backup_writes_every_artifact() {
    let work = tempfile::tempdir().unwrap();
    let root = work.path().join("backups");
    let plan = full_plan(&root, work.path());

    let backup = manager(exec_ok("CREATE TABLE users ();\n"))
        .create_backup(&plan)
        .await
        .unwrap();

    assert!(backup.is_complete());
    assert_eq!(backup.contents().len(), 3);
    assert!(backup.path().starts_with(&root));
    assert!(backup.path().join(DATABASE_DUMP_FILENAME).is_file());
    assert!(backup.path().join(MODEL_ARCHIVE_FILENAME).is_file());
    assert!(backup.path().join(CONFIG_DIRNAME).is_dir());
}

#[tokio::test]
async fn binary_dump_is_written_byte_for_byte() {
    let work = tempfile::tempdir().unwrap();
    let plan = full_plan(&work.path().join("backups"), work.path());
    // Custom-format pg_dump header followed by bytes that are not valid UTF-8.
    let dump = vec![b'P', b'G', b'D', b'M', b'P', 0xff, 0x01, 0x00, 0xc3];
    let output = stackup::runtime::ExecOutput {
        exit_code: Some(0),
        stdout: dump.clone(),
        stderr: String::new(),
    };

    let backup = manager(output).create_backup(&plan).await.unwrap();

    assert!(backup.contents().contains(&Artifact::DatabaseDump));
    assert_eq!(fs::read(backup.path().join(DATABASE_DUMP_FILENAME)).unwrap(), dump);
}

#[tokio::test]
async fn manifest_records_contents_and_failures() {
    let work = tempfile::tempdir().unwrap();
    let mut plan = full_plan(&work.path().join("backups"), work.path());
    plan.models = Some(ModelBackupConfig {
        path: work.path().join("no-models-here"),
        required: false,
    });

    let backup = manager(exec_ok("-- dump\n")).create_backup(&plan).await.unwrap();

    assert!(!backup.is_complete());
    assert_eq!(backup.required_failures().count(), 0);
    assert!(!backup.contents().contains(&Artifact::ModelArchive));

    let manifest: serde_json::Value =
        serde_json::from_slice(&fs::read(backup.path().join("manifest.json")).unwrap()).unwrap();
    assert_eq!(manifest["id"], backup.id().as_str());
    assert_eq!(manifest["failures"][0]["artifact"], "model_archive");
    assert_eq!(manifest["failures"][0]["required"], false);
}

#[tokio::test]
async fn required_failure_is_reported_not_hidden() {
    let work = tempfile::tempdir().unwrap();
    let plan = full_plan(&work.path().join("backups"), work.path());

    let backup = manager(exec_failed("pg_dump: connection refused"))
        .create_backup(&plan)
        .await
        .unwrap();

    let required: Vec<_> = backup.required_failures().collect();
    assert_eq!(required.len(), 1);
    assert_eq!(required[0].artifact, Artifact::DatabaseDump);
    assert!(required[0].error.contains("connection refused"));
}

#[tokio::test]
async fn empty_dump_counts_as_failure() {
    let work = tempfile::tempdir().unwrap();
    let plan = BackupConfig {
        models: None,
        config: None,
        ..full_plan(&work.path().join("backups"), work.path())
    };

    let err = manager(exec_ok("")).create_backup(&plan).await.unwrap_err();
    assert!(matches!(err, BackupError::Total { .. }));
}

#[tokio::test]
async fn every_part_failing_is_total() {
    let work = tempfile::tempdir().unwrap();
    let mut plan = full_plan(&work.path().join("backups"), work.path());
    plan.models = Some(ModelBackupConfig {
        path: work.path().join("gone"),
        required: false,
    });
    plan.config = Some(ConfigBackupConfig {
        files: vec![work.path().join("gone.env")],
        required: true,
    });

    let err = manager(exec_failed("boom")).create_backup(&plan).await.unwrap_err();
    match err {
        BackupError::Total { failures, .. } => assert_eq!(failures.len(), 3),
        other => panic!("expected total failure, got {other}"),
    }
}

#[tokio::test]
async fn existing_backup_is_never_overwritten() {
    let work = tempfile::tempdir().unwrap();
    let plan = full_plan(&work.path().join("backups"), work.path());
    let manager = manager(exec_ok("-- dump\n"));
    let id = BackupId::generate();

    let first = manager.create_backup_as(&plan, id.clone()).await.unwrap();
    let dump = fs::read(first.path().join(DATABASE_DUMP_FILENAME)).unwrap();

    let err = manager.create_backup_as(&plan, id).await.unwrap_err();
    assert!(matches!(err, BackupError::AlreadyExists { .. }));
    assert_eq!(fs::read(first.path().join(DATABASE_DUMP_FILENAME)).unwrap(), dump);
}

#[tokio::test]
async fn rapid_backups_get_distinct_directories() {
    let work = tempfile::tempdir().unwrap();
    let plan = full_plan(&work.path().join("backups"), work.path());
    let manager = manager(exec_ok("-- dump\n"));

    let a = manager.create_backup(&plan).await.unwrap();
    let b = manager.create_backup(&plan).await.unwrap();
    assert_ne!(a.id(), b.id());
    assert_ne!(a.path(), b.path());
}

proptest! {
    /// Identifiers issued for any sequence of timestamps are pairwise distinct.
    #[test]
    fn generated_ids_never_collide(offsets in prop::collection::vec(-3i64..3, 1..64)) {
        let generator = BackupIdGenerator::new();
        let base = chrono::Utc::now();
        let mut seen = HashSet::new();
        for offset in offsets {
            let id = generator.next_at(base + chrono::Duration::seconds(offset));
            prop_assert!(seen.insert(id.clone()), "duplicate id {}", id);
        }
    }
}
