// ABOUTME: Docker Compose CLI backend for ContainerManager.
// ABOUTME: Spawns `docker compose` with the project file and captures its output.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use super::manager::{ContainerManager, ExecOutput, ManagerError};
use crate::types::ServiceName;

/// Drives a Compose project through the CLI.
#[derive(Debug, Clone)]
pub struct Compose {
    program: String,
    base_args: Vec<String>,
    env: HashMap<String, String>,
}

impl Compose {
    /// Create a backend from a command prefix such as `["docker", "compose"]`.
    pub fn new(command: &[String], project: &str, compose_file: &Path) -> Self {
        let (program, prefix) = match command.split_first() {
            Some((program, rest)) => (program.clone(), rest.to_vec()),
            None => ("docker".to_string(), vec!["compose".to_string()]),
        };

        let mut base_args = prefix;
        base_args.push("-f".to_string());
        base_args.push(compose_file.display().to_string());
        base_args.push("-p".to_string());
        base_args.push(project.to_string());

        Self {
            program,
            base_args,
            env: HashMap::new(),
        }
    }

    /// Environment passed to every manager invocation.
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Full argument vector for a subcommand.
    pub fn args_for(&self, args: &[&str]) -> Vec<String> {
        self.base_args
            .iter()
            .cloned()
            .chain(args.iter().map(|a| a.to_string()))
            .collect()
    }

    async fn run(&self, args: &[&str]) -> Result<ExecOutput, ManagerError> {
        let argv = self.args_for(args);
        tracing::debug!("running {} {}", self.program, argv.join(" "));

        let mut command = Command::new(&self.program);
        command
            .args(&argv)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = command
            .output()
            .await
            .map_err(|e| ManagerError::Unavailable {
                program: self.program.clone(),
                message: e.to_string(),
            })?;

        Ok(ExecOutput {
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    /// Run a subcommand that must succeed.
    async fn run_checked(&self, args: &[&str]) -> Result<ExecOutput, ManagerError> {
        let output = self.run(args).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(ManagerError::Failed {
                command: format!("{} {}", self.program, self.args_for(args).join(" ")),
                exit_code: output.exit_code,
                stderr: output.stderr,
            })
        }
    }
}

#[async_trait]
impl ContainerManager for Compose {
    async fn pull(&self) -> Result<(), ManagerError> {
        self.run_checked(&["pull", "--ignore-buildable"]).await?;
        Ok(())
    }

    async fn build(&self) -> Result<(), ManagerError> {
        self.run_checked(&["build"]).await?;
        Ok(())
    }

    async fn up(&self) -> Result<(), ManagerError> {
        self.run_checked(&["up", "-d", "--remove-orphans"]).await?;
        Ok(())
    }

    async fn status(&self, service: &ServiceName) -> Result<String, ManagerError> {
        let output = self.run_checked(&["ps", "--all", service.as_str()]).await?;
        Ok(output.stdout_text().into_owned())
    }

    async fn exec(
        &self,
        service: &ServiceName,
        command: &[String],
    ) -> Result<ExecOutput, ManagerError> {
        let mut args = vec!["exec", "-T", service.as_str()];
        args.extend(command.iter().map(String::as_str));
        self.run(&args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compose() -> Compose {
        Compose::new(
            &["docker".to_string(), "compose".to_string()],
            "llm-platform",
            Path::new("deploy/docker-compose.yml"),
        )
    }

    #[test]
    fn args_include_file_and_project() {
        assert_eq!(
            compose().args_for(&["up", "-d"]),
            vec![
                "compose",
                "-f",
                "deploy/docker-compose.yml",
                "-p",
                "llm-platform",
                "up",
                "-d"
            ]
        );
    }

    #[test]
    fn standalone_compose_binary() {
        let compose = Compose::new(
            &["docker-compose".to_string()],
            "p",
            Path::new("docker-compose.yml"),
        );
        assert_eq!(compose.program, "docker-compose");
        assert_eq!(compose.args_for(&["build"])[0], "-f");
    }

    #[tokio::test]
    async fn missing_binary_is_unavailable() {
        let compose = Compose::new(
            &["stackup-no-such-binary".to_string()],
            "p",
            Path::new("docker-compose.yml"),
        );
        let err = compose.build().await.unwrap_err();
        assert!(matches!(err, ManagerError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn exec_keeps_raw_stdout_bytes() {
        // `sh -c` ignores the compose arguments appended after the script.
        let compose = Compose::new(
            &[
                "sh".to_string(),
                "-c".to_string(),
                r"printf 'PGDMP\377\001\000'".to_string(),
            ],
            "p",
            Path::new("docker-compose.yml"),
        );
        let db = ServiceName::new("postgres").unwrap();
        let output = compose.exec(&db, &["pg_dump".to_string()]).await.unwrap();

        assert!(output.success());
        assert_eq!(output.stdout, vec![b'P', b'G', b'D', b'M', b'P', 0xff, 0x01, 0x00]);
    }

    #[tokio::test]
    async fn failing_command_reports_exit_code() {
        // `false` ignores its arguments and exits 1.
        let compose = Compose::new(&["false".to_string()], "p", Path::new("docker-compose.yml"));
        let err = compose.up().await.unwrap_err();
        assert_eq!(err.exit_code(), Some(1));
    }
}
