// ABOUTME: Validated domain types shared across the orchestrator.
// ABOUTME: Service names and backup identifiers.

mod backup_id;
mod service_name;

pub use backup_id::{BackupId, BackupIdGenerator};
pub use service_name::{ServiceName, ServiceNameError};
