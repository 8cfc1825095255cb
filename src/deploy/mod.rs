// ABOUTME: Deployment orchestration using the type state pattern.
// ABOUTME: Exports state markers, the plan, the report and the orchestrator driving them.

mod deployment;
mod error;
mod lock;
mod orchestrator;
mod plan;
mod report;
mod state;
mod transitions;

pub use deployment::{Deployment, Transition};
pub use error::{Aborted, PrereqError, Unmet, VerificationError};
pub use lock::{DeployLock, LockError, LockInfo};
pub use orchestrator::{Orchestrator, RunOptions};
pub use plan::{DeploymentPlan, Prerequisites, ServiceSpec};
pub use report::{
    DeploymentReport, Outcome, ParseReportError, StageFamily, StageResult, StageStatus,
};
pub use state::{
    BackedUp, Built, Initialized, Migrated, PrereqsChecked, Provisioned, Ready, Started,
    Verified,
};
pub use transitions::{
    STAGE_BACKUP, STAGE_BUILD, STAGE_MIGRATE, STAGE_PLAN, STAGE_PREREQS, STAGE_START,
    STAGE_VERIFY, model_stage, ready_stage,
};
