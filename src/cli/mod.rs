//! CLI module for orquestra
//!
//! This module provides:
//! - Command implementations (run, validate, plan, providers)
//! - Output handlers (console, JSON, quiet)
//! - Signal handling to interrupt a run
//!
//! # Example
//!
//! ```ignore
//! use orquestra::cli::{RunFlags, create_handler, run_workflow};
//!
//! let handler = create_handler(OutputMode::Console);
//! let exit_code = run_workflow(path, &config, RunFlags::default(), &*handler).await;
//! ```

pub mod commands;
pub mod output;
pub mod signals;

pub use commands::{RunFlags, list_providers, run_workflow, show_plan, validate_workflow};
pub use output::{OutputEvent, OutputHandler, OutputMode, create_handler};
pub use signals::{shutdown_signal, with_cancellation};
