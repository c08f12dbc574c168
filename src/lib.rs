//! Orquestra: run workflows of LLM agent tasks ordered by their dependencies
//!
//! A workflow names agents (provider + model) and tasks. Each task's
//! instruction is a template that may reference the outputs of the tasks it
//! depends on. Tasks are grouped into batches so that every task runs after
//! all of its dependencies, and the run stops at the first failure.

pub mod agents;
pub mod cli;
pub mod config;
pub mod logging;
pub mod template;
pub mod workflow;
