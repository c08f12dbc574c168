//! Configuration types and loading for orquestra

mod loader;
mod provider;
mod workflow;

pub use loader::{Defaults, OrquestraConfig, WorkflowFormat, load_workflow, parse_workflow};
pub use provider::ProviderConfig;
pub use workflow::{Agent, Task, Workflow};
