// ABOUTME: Command module aggregator for the stackup CLI.
// ABOUTME: Re-exports deploy, healthcheck and backup handlers plus shared wiring.

mod backup;
mod deploy;
mod healthcheck;

pub use backup::backup;
pub use deploy::{DeployOptions, deploy};
pub use healthcheck::healthcheck;

use std::collections::HashMap;
use std::sync::Arc;

use stackup::config::{Config, resolve_env_map};
use stackup::runtime::{Compose, ServiceController};

/// Environment passed to Compose and local migrations. Unset variables are
/// reported by the prereq stage, not here.
fn resolved_env(config: &Config) -> HashMap<String, String> {
    let (env, _missing) = resolve_env_map(&config.env);
    env.into_iter().collect()
}

/// Controller for the configured Compose project.
fn controller(config: &Config) -> Arc<ServiceController<Compose>> {
    let compose = Compose::new(&config.compose_command, &config.project, &config.compose_file)
        .with_env(resolved_env(config));
    Arc::new(ServiceController::new(compose).with_pull(config.pull))
}
