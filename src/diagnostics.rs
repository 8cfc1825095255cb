// ABOUTME: Diagnostics accumulator for non-fatal warnings during a command.
// ABOUTME: Collects warnings that shouldn't fail a run but should be shown to users.

/// Collects non-fatal warnings during a run.
#[derive(Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A non-fatal warning collected during a run.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// Create a lock release warning.
    pub fn lock_release(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::LockRelease,
            message: message.into(),
        }
    }

    /// Create a skipped-backup warning.
    pub fn backup_skipped(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::BackupSkipped,
            message: message.into(),
        }
    }

    /// Create a plan warning (advisory finding from validation).
    pub fn plan(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::Plan,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Failed to release deploy lock (lock file may remain).
    LockRelease,
    /// Deployment ran without a recovery point.
    BackupSkipped,
    Plan,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_starts_empty() {
        let diag = Diagnostics::default();
        assert!(!diag.has_warnings());
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn diagnostics_collects_warnings() {
        let mut diag = Diagnostics::default();

        diag.warn(Warning::lock_release("failed to remove lock file"));
        diag.warn(Warning::backup_skipped("--skip-backup given"));

        assert!(diag.has_warnings());
        assert_eq!(diag.warnings().len(), 2);
    }

    #[test]
    fn warning_constructors_set_correct_kind() {
        assert_eq!(Warning::lock_release("test").kind, WarningKind::LockRelease);
        assert_eq!(Warning::backup_skipped("test").kind, WarningKind::BackupSkipped);
        assert_eq!(Warning::plan("test").kind, WarningKind::Plan);
    }
}
