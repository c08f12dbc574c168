//! Run state shared between tasks

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Output recorded for one completed task
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskOutput {
    pub output: String,
}

/// Outputs of completed tasks, keyed by task name
///
/// This is also the context instructions are rendered against, so
/// `{{ tasks.draft.output }}` resolves to the output of task `draft`.
/// Entries are only ever added.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionContext {
    tasks: BTreeMap<String, TaskOutput>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a task's output
    ///
    /// Returns false and leaves the context untouched if the task already
    /// has an entry.
    pub fn record(&mut self, task: impl Into<String>, output: impl Into<String>) -> bool {
        let task = task.into();
        if self.tasks.contains_key(&task) {
            tracing::warn!(task = %task, "Ignoring second output for task");
            return false;
        }
        self.tasks.insert(
            task,
            TaskOutput {
                output: output.into(),
            },
        );
        true
    }

    /// Output of a completed task
    pub fn output(&self, task: &str) -> Option<&str> {
        self.tasks.get(task).map(|t| t.output.as_str())
    }

    pub fn contains(&self, task: &str) -> bool {
        self.tasks.contains_key(task)
    }

    /// Number of completed tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Completed tasks in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tasks
            .iter()
            .map(|(name, t)| (name.as_str(), t.output.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_read() {
        let mut ctx = ExecutionContext::new();
        assert!(ctx.is_empty());

        assert!(ctx.record("draft", "Once upon a time"));
        assert_eq!(ctx.output("draft"), Some("Once upon a time"));
        assert!(ctx.contains("draft"));
        assert_eq!(ctx.output("edit"), None);
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn test_entries_never_overwritten() {
        let mut ctx = ExecutionContext::new();
        assert!(ctx.record("draft", "first"));
        assert!(!ctx.record("draft", "second"));
        assert_eq!(ctx.output("draft"), Some("first"));
    }

    #[test]
    fn test_serialized_shape() {
        let mut ctx = ExecutionContext::new();
        ctx.record("b", "Y");
        ctx.record("a", "X");

        let value = serde_json::to_value(&ctx).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "tasks": {
                    "a": {"output": "X"},
                    "b": {"output": "Y"}
                }
            })
        );

        let back: ExecutionContext = serde_json::from_value(value).unwrap();
        assert_eq!(back, ctx);
    }

    #[test]
    fn test_iter_in_name_order() {
        let mut ctx = ExecutionContext::new();
        ctx.record("zeta", "1");
        ctx.record("alpha", "2");
        let names: Vec<_> = ctx.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_renders_as_template_context() {
        let mut ctx = ExecutionContext::new();
        ctx.record("task_a", "X");
        ctx.record("task_b", "Y");
        let out = crate::template::render("{{ tasks.task_a.output }}", &ctx).unwrap();
        assert_eq!(out, "X");
    }
}
