// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "stackup")]
#[command(about = "Deploy a Compose LLM stack: back up, rebuild, wait for readiness, migrate, verify")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the configuration file (default: discover stackup.yml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Minimal output for CI
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// JSON lines output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full deployment pipeline
    Deploy {
        /// Override max_total_wait for readiness (e.g. 90s, 5m)
        #[arg(long, value_parser = humantime::parse_duration)]
        timeout: Option<Duration>,

        /// Do not back up before mutating anything (logged)
        #[arg(long)]
        skip_backup: bool,

        /// Check prerequisites and the plan only; change nothing
        #[arg(long)]
        dry_run: bool,

        /// Break an existing deploy lock
        #[arg(short, long)]
        force: bool,
    },

    /// Check every service once and print the aggregate health
    Healthcheck,

    /// Create a standalone backup and print its identifier
    Backup,

    /// Write a template stackup.yml
    Init {
        /// Compose project name (default: directory name)
        #[arg(short, long)]
        project: Option<String>,

        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },
}
