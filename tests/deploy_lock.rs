// ABOUTME: Integration tests for deploy lock functionality.
// ABOUTME: Tests lock acquisition, stale detection, and force breaking.

use chrono::Utc;
use stackup::deploy::{DeployLock, LockError, LockInfo};
use stackup::error::Error;
use std::fs;

/// Test: Lock acquired prevents second deployment.
#[tokio::test]
async fn lock_acquired_prevents_second_deployment() {
    let state = tempfile::tempdir().unwrap();

    let lock = DeployLock::acquire(state.path(), "llm", false)
        .await
        .expect("first lock should succeed");
    assert!(lock.path().is_file());

    let err = DeployLock::acquire(state.path(), "llm", false)
        .await
        .expect_err("second lock should fail");
    match &err {
        LockError::Held { holder, pid, .. } => {
            assert!(!holder.is_empty(), "holder should be set");
            assert_eq!(*pid, std::process::id());
        }
        other => panic!("expected held lock, got {other}"),
    }

    let err: Error = err.into();
    assert_eq!(err.exit_code(), 7);

    lock.release().await.expect("release should succeed");

    let lock2 = DeployLock::acquire(state.path(), "llm", false)
        .await
        .expect("lock should succeed after release");
    lock2.release().await.expect("cleanup release");
}

/// Test: Different projects do not contend.
#[tokio::test]
async fn locks_are_per_project() {
    let state = tempfile::tempdir().unwrap();

    let a = DeployLock::acquire(state.path(), "llm-a", false).await.unwrap();
    let b = DeployLock::acquire(state.path(), "llm-b", false).await.unwrap();

    a.release().await.unwrap();
    b.release().await.unwrap();
}

/// Test: Force flag breaks an active lock.
#[tokio::test]
async fn force_breaks_existing_lock() {
    let state = tempfile::tempdir().unwrap();
    let _held = DeployLock::acquire(state.path(), "llm", false).await.unwrap();

    let forced = DeployLock::acquire(state.path(), "llm", true)
        .await
        .expect("force should break the lock");
    forced.release().await.unwrap();
}

/// Test: A lock older than an hour is broken automatically.
#[tokio::test]
async fn stale_lock_is_broken() {
    let state = tempfile::tempdir().unwrap();
    let mut info = LockInfo::new("llm");
    info.pid = 1;
    info.started_at = Utc::now() - chrono::Duration::hours(3);
    fs::write(
        LockInfo::lock_path(state.path(), "llm"),
        serde_json::to_vec(&info).unwrap(),
    )
    .unwrap();

    let lock = DeployLock::acquire(state.path(), "llm", false)
        .await
        .expect("stale lock should be broken");

    let current: LockInfo = serde_json::from_slice(&fs::read(lock.path()).unwrap()).unwrap();
    assert_eq!(current.pid, std::process::id());
    lock.release().await.unwrap();
}

/// Test: Corrupted lock files are broken.
#[tokio::test]
async fn corrupt_lock_is_broken() {
    let state = tempfile::tempdir().unwrap();
    fs::write(LockInfo::lock_path(state.path(), "llm"), "not json").unwrap();

    let lock = DeployLock::acquire(state.path(), "llm", false).await.unwrap();
    lock.release().await.unwrap();
}

/// Test: with_lock releases the lock after the work completes.
#[tokio::test]
async fn with_lock_releases_afterwards() {
    let state = tempfile::tempdir().unwrap();
    let path = LockInfo::lock_path(state.path(), "llm");

    let seen = DeployLock::with_lock(state.path(), "llm", false, async { path.is_file() })
        .await
        .unwrap();

    assert!(seen, "lock file should exist while work runs");
    assert!(!path.exists(), "lock file should be removed afterwards");
}

/// Test: with_lock refuses to run work while another run holds the lock.
#[tokio::test]
async fn with_lock_rejects_concurrent_run() {
    let state = tempfile::tempdir().unwrap();
    let held = DeployLock::acquire(state.path(), "llm", false).await.unwrap();

    let mut ran = false;
    let result = DeployLock::with_lock(state.path(), "llm", false, async { ran = true }).await;

    assert!(matches!(result, Err(LockError::Held { .. })));
    assert!(!ran);
    held.release().await.unwrap();
}

/// Test: The state directory is created on demand.
#[tokio::test]
async fn creates_missing_state_dir() {
    let root = tempfile::tempdir().unwrap();
    let state = root.path().join(".stackup").join("locks");

    let lock = DeployLock::acquire(&state, "llm", false).await.unwrap();
    assert!(state.is_dir());
    lock.release().await.unwrap();
}
