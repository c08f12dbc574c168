//! Workflow execution engine for orquestra
//!
//! This module handles:
//! - Dependency resolution into ordered batches
//! - Rendering each instruction against the outputs of earlier batches
//! - Dispatching tasks to their agents, sequentially or concurrently
//! - Fail-fast error reporting with the partial run state
//!
//! # Example
//!
//! ```ignore
//! use orquestra::config::{OrquestraConfig, load_workflow};
//! use orquestra::workflow::Orchestrator;
//!
//! let config = OrquestraConfig::load(None)?;
//! let orchestrator = Orchestrator::from_config(&config);
//!
//! let workflow = load_workflow("blog.toml", orchestrator.registry().providers())?;
//! match orchestrator.run(&workflow).await {
//!     Ok(context) => println!("{}", context.output("edit").unwrap_or_default()),
//!     Err(err) => eprintln!("{} ({})", err, err.kind()),
//! }
//! ```

mod error;
mod runner;
mod scheduler;
mod state;

pub use error::{FailureKind, RunError, WorkflowError};
pub use runner::{Orchestrator, RunOptions};
pub use scheduler::{BatchPlan, SchedulerError, resolve_task_order};
pub use state::{ExecutionContext, TaskOutput};
