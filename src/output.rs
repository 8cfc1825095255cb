// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes for reports and health summaries.

use serde::Serialize;
use std::time::Instant;

use crate::deploy::{DeploymentReport, StageStatus};
use crate::diagnostics::Diagnostics;
use crate::health::HealthSummary;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => {
                // Print only the essential result
                println!("{message}");
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "success",
                    message,
                    duration_secs: if self.start_time.is_some() {
                        Some(self.elapsed_secs())
                    } else {
                        None
                    },
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    println!("{json}");
                }
            }
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "error",
                    message,
                    duration_secs: if self.start_time.is_some() {
                        Some(self.elapsed_secs())
                    } else {
                        None
                    },
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }
}

impl Output {
    /// Print a non-fatal warning (stderr; suppressed in quiet mode).
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => eprintln!("Warning: {message}"),
            OutputMode::Quiet => {}
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "warning",
                    message,
                    duration_secs: None,
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }

    /// Print every warning collected during the run.
    pub fn diagnostics(&self, diagnostics: &Diagnostics) {
        for warning in diagnostics.warnings() {
            self.warning(&warning.message);
        }
    }

    /// Print the deployment report.
    ///
    /// Quiet mode prints only failed stages and the outcome line.
    pub fn report(&self, report: &DeploymentReport) {
        match self.mode {
            OutputMode::Normal => print!("{report}"),
            OutputMode::Quiet => {
                for stage in report.stages().iter().filter(|s| s.status == StageStatus::Failed) {
                    println!("{}: {}", stage.stage, stage.detail);
                }
                println!("{}", report.outcome());
                if !report.is_success()
                    && let Some(id) = report.backup_id()
                {
                    println!("backup: {id}");
                }
            }
            OutputMode::Json => self.json("report", report),
        }
    }

    /// Print a health summary.
    pub fn health(&self, summary: &HealthSummary) {
        match self.mode {
            OutputMode::Normal => print!("{summary}"),
            OutputMode::Quiet => println!("{}", summary.overall),
            OutputMode::Json => self.json("health", summary),
        }
    }

    fn json<T: Serialize>(&self, event: &str, data: &T) {
        let line = JsonData { event, data };
        if let Ok(json) = serde_json::to_string(&line) {
            println!("{json}");
        }
    }
}

#[derive(Serialize)]
struct JsonData<'a, T> {
    event: &'a str,
    data: &'a T,
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}
