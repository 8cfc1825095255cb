// ABOUTME: Integration tests for the stackup CLI commands.
// ABOUTME: Validates --help output, init, dry runs, the deploy lock and exit codes.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

fn stackup_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("stackup"))
}

/// Write a config plus an empty compose file into `dir`.
fn write_project(dir: &Path, extra: &str) {
    fs::write(dir.join("docker-compose.yml"), "services: {}\n").unwrap();
    fs::write(
        dir.join("stackup.yml"),
        format!(
            r#"project: llm
compose_command: [stackup-no-such-compose]
check_timeout: 1s
{extra}
services:
  - name: api
"#
        ),
    )
    .unwrap();
}

#[test]
fn help_shows_commands() {
    stackup_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("healthcheck"))
        .stdout(predicate::str::contains("backup"))
        .stdout(predicate::str::contains("init"));
}

#[test]
fn deploy_help_shows_flags() {
    stackup_cmd()
        .args(["deploy", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--timeout"))
        .stdout(predicate::str::contains("--skip-backup"))
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn init_creates_config_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("stackup.yml");

    stackup_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--project", "my-llm"])
        .assert()
        .success();

    assert!(config_path.exists(), "stackup.yml should be created");
    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("project: my-llm"));
    assert!(content.contains("services:"));
}

#[test]
fn init_refuses_to_overwrite_existing_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("stackup.yml");

    fs::write(&config_path, "existing: config").unwrap();

    stackup_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn missing_config_exits_one() {
    let temp_dir = tempfile::tempdir().unwrap();

    stackup_cmd()
        .current_dir(temp_dir.path())
        .arg("healthcheck")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn dry_run_validates_plan() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_project(temp_dir.path(), "prereqs:\n  tools: []");

    stackup_cmd()
        .current_dir(temp_dir.path())
        .args(["deploy", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("validated"));

    assert!(!temp_dir.path().join("backups").exists());
}

#[test]
fn dry_run_json_emits_report() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_project(temp_dir.path(), "prereqs:\n  tools: []");

    let output = stackup_cmd()
        .current_dir(temp_dir.path())
        .args(["--json", "deploy", "--dry-run"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let report = stdout
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
        .find(|event| event["event"] == "report")
        .expect("report event");
    assert_eq!(report["data"]["outcome"]["state"], "validated");
    assert_eq!(report["data"]["stages"][0]["stage"], "prereqs");
}

#[test]
fn missing_tool_is_a_prereq_failure() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_project(temp_dir.path(), "prereqs:\n  tools: [stackup-no-such-tool]");

    stackup_cmd()
        .current_dir(temp_dir.path())
        .args(["deploy", "--dry-run"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("stackup-no-such-tool"));
}

#[test]
fn held_lock_rejects_deploy() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_project(temp_dir.path(), "prereqs:\n  tools: []");
    fs::create_dir(temp_dir.path().join(".stackup")).unwrap();
    fs::write(
        temp_dir.path().join(".stackup/llm.lock"),
        format!(
            r#"{{"holder":"ci-runner","pid":4242,"started_at":"{}","project":"llm"}}"#,
            chrono::Utc::now().to_rfc3339()
        ),
    )
    .unwrap();

    stackup_cmd()
        .current_dir(temp_dir.path())
        .args(["deploy", "--skip-backup"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("ci-runner"));
}

#[test]
fn healthcheck_without_manager_is_unhealthy() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_project(temp_dir.path(), "");

    stackup_cmd()
        .current_dir(temp_dir.path())
        .arg("healthcheck")
        .assert()
        .code(6)
        .stdout(predicate::str::contains("api"))
        .stdout(predicate::str::contains("overall: unhealthy"));
}

#[test]
fn backup_prints_identifier() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_project(
        temp_dir.path(),
        "backup:\n  root: snapshots\n  config:\n    files: [stackup.yml]",
    );

    stackup_cmd()
        .current_dir(temp_dir.path())
        .args(["--quiet", "backup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup "));

    let entries: Vec<_> = fs::read_dir(temp_dir.path().join("snapshots"))
        .unwrap()
        .collect();
    assert_eq!(entries.len(), 1);
    assert!(!temp_dir.path().join(".stackup/llm.lock").exists());
}
