//! Workflow failures

use super::scheduler::SchedulerError;
use super::state::ExecutionContext;
use crate::agents::{AgentError, ResolveError};
use crate::template::TemplateError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Errors aborting a workflow run
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Schedule(#[from] SchedulerError),

    #[error("task '{task}' references unknown agent '{agent}'")]
    UnknownAgent { task: String, agent: String },

    #[error("task '{task}' uses unknown provider '{provider}'")]
    UnknownProvider { task: String, provider: String },

    #[error("task '{task}': failed to initialize provider '{provider}': {source}")]
    ProviderInit {
        task: String,
        provider: String,
        #[source]
        source: AgentError,
    },

    #[error("task '{task}': {source}")]
    Template {
        task: String,
        #[source]
        source: TemplateError,
    },

    #[error("task '{task}' failed: {source}")]
    Agent {
        task: String,
        #[source]
        source: AgentError,
    },
}

/// Classification of a run failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MissingDependency,
    DuplicateTask,
    CycleDetected,
    UnknownAgent,
    UnknownProvider,
    ProviderInit,
    UndefinedReference,
    Template,
    EmptyResponse,
    Capability,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::MissingDependency => "missing-dependency",
            FailureKind::DuplicateTask => "duplicate-task",
            FailureKind::CycleDetected => "cycle-detected",
            FailureKind::UnknownAgent => "unknown-agent",
            FailureKind::UnknownProvider => "unknown-provider",
            FailureKind::ProviderInit => "provider-init",
            FailureKind::UndefinedReference => "undefined-reference",
            FailureKind::Template => "template",
            FailureKind::EmptyResponse => "empty-response",
            FailureKind::Capability => "capability",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl WorkflowError {
    /// Build from a provider resolution failure for a task
    pub(crate) fn resolve(task: &str, err: ResolveError) -> Self {
        match err {
            ResolveError::UnknownProvider { provider } => WorkflowError::UnknownProvider {
                task: task.to_string(),
                provider,
            },
            ResolveError::Init { provider, source } => WorkflowError::ProviderInit {
                task: task.to_string(),
                provider,
                source,
            },
        }
    }

    /// Name of the failing task, if the failure belongs to one
    pub fn task(&self) -> Option<&str> {
        match self {
            WorkflowError::Schedule(SchedulerError::MissingDependency { task, .. })
            | WorkflowError::Schedule(SchedulerError::DuplicateTask { task }) => Some(task),
            WorkflowError::Schedule(SchedulerError::CycleDetected { .. }) => None,
            WorkflowError::UnknownAgent { task, .. }
            | WorkflowError::UnknownProvider { task, .. }
            | WorkflowError::ProviderInit { task, .. }
            | WorkflowError::Template { task, .. }
            | WorkflowError::Agent { task, .. } => Some(task),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            WorkflowError::Schedule(SchedulerError::MissingDependency { .. }) => {
                FailureKind::MissingDependency
            }
            WorkflowError::Schedule(SchedulerError::DuplicateTask { .. }) => {
                FailureKind::DuplicateTask
            }
            WorkflowError::Schedule(SchedulerError::CycleDetected { .. }) => {
                FailureKind::CycleDetected
            }
            WorkflowError::UnknownAgent { .. } => FailureKind::UnknownAgent,
            WorkflowError::UnknownProvider { .. } => FailureKind::UnknownProvider,
            WorkflowError::ProviderInit { .. } => FailureKind::ProviderInit,
            WorkflowError::Template {
                source: TemplateError::UndefinedReference { .. },
                ..
            } => FailureKind::UndefinedReference,
            WorkflowError::Template { .. } => FailureKind::Template,
            WorkflowError::Agent { source, .. } if source.is_empty_response() => {
                FailureKind::EmptyResponse
            }
            WorkflowError::Agent { .. } => FailureKind::Capability,
        }
    }
}

/// A failed run, with the outputs completed before the failure
#[derive(Debug, Error)]
#[error("workflow '{workflow}' failed: {error}")]
pub struct RunError {
    pub workflow: String,
    #[source]
    pub error: WorkflowError,
    pub context: ExecutionContext,
}

impl RunError {
    pub fn task(&self) -> Option<&str> {
        self.error.task()
    }

    pub fn kind(&self) -> FailureKind {
        self.error.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_task() {
        let err = WorkflowError::from(SchedulerError::MissingDependency {
            task: "edit".into(),
            dependency: "draft".into(),
        });
        assert_eq!(err.kind(), FailureKind::MissingDependency);
        assert_eq!(err.task(), Some("edit"));

        let err = WorkflowError::from(SchedulerError::CycleDetected { unresolved: 2 });
        assert_eq!(err.kind(), FailureKind::CycleDetected);
        assert_eq!(err.task(), None);
    }

    #[test]
    fn test_agent_error_kinds() {
        let empty = WorkflowError::Agent {
            task: "draft".into(),
            source: AgentError::empty_response("openai"),
        };
        assert_eq!(empty.kind(), FailureKind::EmptyResponse);

        let network = WorkflowError::Agent {
            task: "draft".into(),
            source: AgentError::network("connection reset"),
        };
        assert_eq!(network.kind(), FailureKind::Capability);
        assert!(network.to_string().contains("connection reset"));
    }

    #[test]
    fn test_template_error_kinds() {
        let undefined = WorkflowError::Template {
            task: "edit".into(),
            source: TemplateError::undefined_reference("tasks.draft.output", 1, &[] as &[&str]),
        };
        assert_eq!(undefined.kind(), FailureKind::UndefinedReference);

        let syntax = WorkflowError::Template {
            task: "edit".into(),
            source: TemplateError::syntax("unexpected end of input", 1),
        };
        assert_eq!(syntax.kind(), FailureKind::Template);
    }

    #[test]
    fn test_resolve_mapping() {
        let err = WorkflowError::resolve(
            "draft",
            ResolveError::UnknownProvider {
                provider: "mistral".into(),
            },
        );
        assert_eq!(err.kind(), FailureKind::UnknownProvider);
        assert_eq!(
            err.to_string(),
            "task 'draft' uses unknown provider 'mistral'"
        );

        let err = WorkflowError::resolve(
            "draft",
            ResolveError::Init {
                provider: "openai".into(),
                source: AgentError::auth("missing environment variable: OPENAI_API_KEY"),
            },
        );
        assert_eq!(err.kind(), FailureKind::ProviderInit);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(FailureKind::UndefinedReference.to_string(), "undefined-reference");
        assert_eq!(
            serde_json::to_value(FailureKind::EmptyResponse).unwrap(),
            serde_json::json!("empty_response")
        );
    }
}
