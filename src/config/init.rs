// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Writes a stackup.yml template for the local LLM stack.

use std::path::Path;

use crate::error::{Error, Result};

use super::{CONFIG_FILENAME, Config, ReadinessConfig};

pub fn init_config(dir: &Path, project: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let mut config = Config::template()?;

    if let Some(p) = project {
        if p.trim().is_empty() {
            return Err(Error::InvalidConfig("project name cannot be empty".to_string()));
        }
        config.project = p.to_string();
    }

    let yaml = generate_template_yaml(&config);
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(config: &Config) -> String {
    let mut yaml = format!(
        r#"project: {}
compose_file: {}
max_total_wait: {}
poll_interval: {}

prereqs:
  tools: [docker]
  # Credentials that must be present before anything is touched
  # env: [POSTGRES_PASSWORD]

services:
"#,
        config.project,
        config.compose_file.display(),
        humantime::format_duration(config.max_total_wait),
        humantime::format_duration(config.poll_interval),
    );

    for service in config.services.iter() {
        yaml.push_str(&format!(
            "  - name: {}\n    required: {}\n    startup_timeout: {}\n",
            service.name,
            service.required,
            humantime::format_duration(service.startup_timeout)
        ));
        match &service.readiness {
            ReadinessConfig::Http { url, .. } => {
                yaml.push_str(&format!("    readiness:\n      kind: http\n      url: {url}\n"));
            }
            ReadinessConfig::Exec { command, expect } => {
                yaml.push_str(&format!(
                    "    readiness:\n      kind: exec\n      command: [{}]\n",
                    command.join(", ")
                ));
                if let Some(expect) = expect {
                    yaml.push_str(&format!("      expect: {expect:?}\n"));
                }
            }
            ReadinessConfig::Running => {
                yaml.push_str("    readiness:\n      kind: running\n");
            }
        }
    }

    yaml.push_str(
        r#"
backup:
  root: backups
  database:
    service: postgres
    command: [pg_dump, -U, llm_user, llm_db]
  models:
    path: data/models
    required: false
  config:
    files: [.env, docker-compose.yml]

migrate:
  service: api
  database: postgres
  command: [alembic, upgrade]
  target: head
"#,
    );

    if !config.models.is_empty() {
        yaml.push_str("\n# Pulled into the runtime service after readiness if missing\nmodels:\n");
        for model in &config.models {
            yaml.push_str(&format!(
                "  - service: {}\n    name: {}\n    required: {}\n",
                model.service, model.name, model.required
            ));
        }
    }

    yaml
}
