// ABOUTME: Container manager integration for the deployed stack.
// ABOUTME: Exposes the ContainerManager capability trait, its Compose CLI backend, and ServiceController.

mod compose;
mod controller;
mod manager;

pub use compose::Compose;
pub use controller::{ServiceController, ServiceError, ServiceStatus};
pub use manager::{ContainerManager, ExecOutput, ManagerError, exit_status};
pub(crate) use manager::trimmed;
