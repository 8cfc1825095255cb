// ABOUTME: Entry point for the stackup CLI application.
// ABOUTME: Parses arguments, initialises logging, and maps command results to exit codes.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use stackup::config::{self, Config};
use stackup::error::Result;
use stackup::output::{Output, OutputMode};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };

    if let Err(e) = run(cli, mode).await {
        Output::new(mode).error(&e.to_string());
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli, mode: OutputMode) -> Result<()> {
    let output = Output::new(mode);
    let cwd = env::current_dir()?;

    let load = |path: &Option<std::path::PathBuf>| match path {
        Some(path) => Config::load(path),
        None => Config::discover(&cwd),
    };

    match cli.command {
        Commands::Init { project, force } => {
            config::init_config(&cwd, project.as_deref(), force)?;
            output.success(&format!("Created {}", config::CONFIG_FILENAME));
            Ok(())
        }
        Commands::Deploy {
            timeout,
            skip_backup,
            dry_run,
            force,
        } => {
            let config = load(&cli.config)?;
            let options = commands::DeployOptions {
                timeout,
                skip_backup,
                dry_run,
                force,
            };
            commands::deploy(config, options, output).await
        }
        Commands::Healthcheck => commands::healthcheck(load(&cli.config)?, output).await,
        Commands::Backup => commands::backup(load(&cli.config)?, output).await,
    }
}
