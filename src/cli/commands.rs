//! CLI command implementations

use super::output::{OutputEvent, OutputHandler};
use super::signals::with_cancellation;
use crate::agents::{ExecutorRegistry, credential_env};
use crate::config::{OrquestraConfig, Workflow, load_workflow};
use crate::template::TemplateEngine;
use crate::workflow::{
    BatchPlan, ExecutionContext, FailureKind, Orchestrator, RunOptions, SchedulerError, WorkflowError,
    resolve_task_order,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Flags of the `run` command
#[derive(Debug, Clone, Copy, Default)]
pub struct RunFlags {
    /// Answer every task with its rendered instruction
    pub dry_run: bool,

    /// Force parallel dispatch regardless of config
    pub parallel: bool,

    pub max_concurrent: Option<usize>,
}

impl RunFlags {
    /// Combine with config defaults; flags win
    fn options(&self, config: &OrquestraConfig) -> RunOptions {
        let mut options = RunOptions::from(&config.defaults);
        if self.parallel {
            options.parallel = true;
        }
        if self.max_concurrent.is_some() {
            options.max_concurrent = self.max_concurrent;
        }
        options
    }
}

fn registry_for(config: &OrquestraConfig, dry_run: bool) -> ExecutorRegistry {
    let registry = ExecutorRegistry::from_config(config);
    if dry_run { registry.dry_run() } else { registry }
}

fn plan_names(plan: &BatchPlan<'_>) -> Vec<Vec<String>> {
    plan.names()
        .into_iter()
        .map(|batch| batch.into_iter().map(str::to_string).collect())
        .collect()
}

/// Emit outputs in plan order, returning the last one
fn emit_outputs<'c>(
    plan: &BatchPlan<'_>,
    context: &'c ExecutionContext,
    handler: &dyn OutputHandler,
) -> Option<&'c str> {
    let mut last = None;
    for name in plan.names().into_iter().flatten() {
        if let Some(output) = context.output(name) {
            handler.emit(OutputEvent::TaskOutput {
                name: name.to_string(),
                output: output.to_string(),
            });
            last = Some(output);
        }
    }
    last
}

fn emit_schedule_error(err: SchedulerError, handler: &dyn OutputHandler) {
    let err = WorkflowError::from(err);
    handler.emit(OutputEvent::WorkflowError {
        error: err.to_string(),
        task: err.task().map(str::to_string),
        kind: Some(err.kind().to_string()),
    });
}

/// Check instruction templates against the plan
///
/// Syntax errors are returned as errors. References that can't resolve at
/// run time (non-task paths, tasks that don't run in an earlier batch) are
/// returned as warnings since conditionals may guard them.
fn check_instructions(workflow: &Workflow, plan: &BatchPlan<'_>) -> (Vec<String>, Vec<String>) {
    let engine = TemplateEngine::new();
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for task in &workflow.tasks {
        let references = match engine.references(&task.instruction) {
            Ok(references) => references,
            Err(e) => {
                errors.push(format!("task '{}': {}", task.name, e));
                continue;
            }
        };

        let own = plan.batch_index(&task.name);
        for path in references {
            let target = path
                .strip_prefix("tasks.")
                .and_then(|rest| rest.split('.').next());
            let visible = match (target.and_then(|t| plan.batch_index(t)), own) {
                (Some(dep), Some(own)) => dep < own,
                _ => false,
            };
            if !visible {
                warnings.push(format!(
                    "task '{}' references '{}', which is not an output of an earlier task",
                    task.name, path
                ));
            }
        }
    }

    (errors, warnings)
}

/// Load a workflow file against the providers of a registry
fn load(path: &Path, registry: &ExecutorRegistry, handler: &dyn OutputHandler) -> Option<Workflow> {
    match load_workflow(path, registry.providers()) {
        Ok(workflow) => Some(workflow),
        Err(e) => {
            handler.emit(OutputEvent::WorkflowError {
                error: format!("{:#}", e),
                task: None,
                kind: None,
            });
            None
        }
    }
}

/// Run a workflow file
pub async fn run_workflow(
    path: &Path,
    config: &OrquestraConfig,
    flags: RunFlags,
    handler: &dyn OutputHandler,
) -> i32 {
    let registry = registry_for(config, flags.dry_run);
    let Some(workflow) = load(path, &registry, handler) else {
        return 1;
    };

    let plan = match resolve_task_order(&workflow.tasks) {
        Ok(plan) => plan,
        Err(e) => {
            emit_schedule_error(e, handler);
            return 1;
        }
    };

    handler.emit(OutputEvent::WorkflowStart {
        name: workflow.name.clone(),
        tasks: plan.task_count(),
        batches: plan.len(),
    });
    if flags.dry_run {
        handler.emit(OutputEvent::Info {
            message: "Dry run: instructions are echoed, no provider is called".into(),
        });
    }

    let orchestrator = Orchestrator::new(Arc::new(registry)).with_options(flags.options(config));
    let start = Instant::now();

    let Some(result) = with_cancellation(orchestrator.run(&workflow)).await else {
        handler.emit(OutputEvent::WorkflowError {
            error: "interrupted".into(),
            task: None,
            kind: None,
        });
        handler.result(false, None);
        return 1;
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    match result {
        Ok(context) => {
            let last = emit_outputs(&plan, &context, handler);
            handler.emit(OutputEvent::WorkflowComplete {
                success: true,
                duration_ms,
                tasks_completed: context.len(),
            });
            handler.result(true, last);
            0
        }
        Err(err) => {
            emit_outputs(&plan, &err.context, handler);
            handler.emit(OutputEvent::WorkflowError {
                error: err.error.to_string(),
                task: err.task().map(str::to_string),
                kind: Some(err.kind().to_string()),
            });
            handler.emit(OutputEvent::WorkflowComplete {
                success: false,
                duration_ms,
                tasks_completed: err.context.len(),
            });
            handler.result(false, None);
            1
        }
    }
}

/// Validate a workflow file, including its dependency graph
pub fn validate_workflow(path: &Path, config: &OrquestraConfig, handler: &dyn OutputHandler) -> i32 {
    let registry = registry_for(config, false);
    let Some(workflow) = load(path, &registry, handler) else {
        return 1;
    };

    let plan = match resolve_task_order(&workflow.tasks) {
        Ok(plan) => plan,
        Err(e) => {
            emit_schedule_error(e, handler);
            return 1;
        }
    };

    let (errors, warnings) = check_instructions(&workflow, &plan);
    for warning in warnings {
        handler.emit(OutputEvent::Info {
            message: format!("  warning: {}", warning),
        });
    }

    if !errors.is_empty() {
        handler.emit(OutputEvent::WorkflowError {
            error: format!(
                "workflow '{}' has invalid instructions:\n  - {}",
                workflow.name,
                errors.join("\n  - ")
            ),
            task: None,
            kind: Some(FailureKind::Template.to_string()),
        });
        return 1;
    }

    handler.emit(OutputEvent::Info {
        message: format!(
            "✓ Workflow '{}' is valid ({} tasks in {} batches)",
            workflow.name,
            plan.task_count(),
            plan.len()
        ),
    });
    0
}

/// Print the batch plan of a workflow file
pub fn show_plan(path: &Path, config: &OrquestraConfig, handler: &dyn OutputHandler) -> i32 {
    let registry = registry_for(config, false);
    let Some(workflow) = load(path, &registry, handler) else {
        return 1;
    };

    match resolve_task_order(&workflow.tasks) {
        Ok(plan) => {
            handler.emit(OutputEvent::WorkflowStart {
                name: workflow.name.clone(),
                tasks: plan.task_count(),
                batches: plan.len(),
            });
            handler.emit(OutputEvent::BatchPlan {
                batches: plan_names(&plan),
            });
            0
        }
        Err(e) => {
            emit_schedule_error(e, handler);
            1
        }
    }
}

/// List providers and whether they can be used
pub fn list_providers(config: &OrquestraConfig, handler: &dyn OutputHandler) {
    let registry = registry_for(config, false);

    for name in registry.providers() {
        let settings = config.provider(name);
        let (ready, detail) = match credential_env(name, &settings) {
            Some(var) if std::env::var(var).is_ok() => (true, format!("{} set", var)),
            Some(var) => (false, format!("{} not set", var)),
            None => (true, "no credentials needed".to_string()),
        };
        handler.emit(OutputEvent::Provider {
            name: name.to_string(),
            ready,
            detail,
        });
    }

    for (name, settings) in &config.providers {
        if !settings.enabled {
            handler.emit(OutputEvent::Provider {
                name: name.clone(),
                ready: false,
                detail: "disabled".into(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct MockHandler {
        events: Mutex<Vec<OutputEvent>>,
        results: Mutex<Vec<(bool, Option<String>)>>,
    }

    impl MockHandler {
        fn events(&self) -> Vec<OutputEvent> {
            self.events.lock().unwrap().clone()
        }

        fn results(&self) -> Vec<(bool, Option<String>)> {
            self.results.lock().unwrap().clone()
        }
    }

    impl OutputHandler for MockHandler {
        fn emit(&self, event: OutputEvent) {
            self.events.lock().unwrap().push(event);
        }

        fn result(&self, success: bool, output: Option<&str>) {
            self.results
                .lock()
                .unwrap()
                .push((success, output.map(str::to_string)));
        }
    }

    const BLOG: &str = r#"
name = "Blog Post"

[[agents]]
name = "writer"
provider = "openai"
model = "gpt-4o"

[[tasks]]
name = "outline"
agent = "writer"
instruction = "Outline a post about borrowing"

[[tasks]]
name = "draft"
agent = "writer"
instruction = "Expand: {{ tasks.outline.output }}"
depends_on = ["outline"]
"#;

    fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_dry_run_workflow() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "blog.toml", BLOG);
        let handler = MockHandler::default();

        let flags = RunFlags {
            dry_run: true,
            ..Default::default()
        };
        let code = run_workflow(&path, &OrquestraConfig::default(), flags, &handler)
            .await;
        assert_eq!(code, 0);

        let outputs: Vec<_> = handler
            .events()
            .into_iter()
            .filter_map(|e| match e {
                OutputEvent::TaskOutput { name, output } => Some((name, output)),
                _ => None,
            })
            .collect();
        assert_eq!(
            outputs,
            vec![
                ("outline".to_string(), "Outline a post about borrowing".to_string()),
                (
                    "draft".to_string(),
                    "Expand: Outline a post about borrowing".to_string()
                ),
            ]
        );
        assert_eq!(
            handler.results(),
            vec![(true, Some("Expand: Outline a post about borrowing".to_string()))]
        );
    }

    #[tokio::test]
    async fn test_run_reports_failure_kind() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "broken.toml",
            &BLOG.replace("tasks.outline.output", "tasks.outlin.output"),
        );
        let handler = MockHandler::default();

        let flags = RunFlags {
            dry_run: true,
            ..Default::default()
        };
        let code = run_workflow(&path, &OrquestraConfig::default(), flags, &handler)
            .await;
        assert_eq!(code, 1);

        let error = handler.events().into_iter().find_map(|e| match e {
            OutputEvent::WorkflowError { task, kind, .. } => Some((task, kind)),
            _ => None,
        });
        assert_eq!(
            error,
            Some((Some("draft".into()), Some("undefined-reference".into())))
        );
        assert_eq!(handler.results(), vec![(false, None)]);
    }

    #[tokio::test]
    async fn test_run_missing_file() {
        let dir = TempDir::new().unwrap();
        let handler = MockHandler::default();
        let code = run_workflow(
            &dir.path().join("nope.toml"),
            &OrquestraConfig::default(),
            RunFlags::default(),
            &handler,
        )
        .await;
        assert_eq!(code, 1);
        assert!(matches!(
            handler.events().first(),
            Some(OutputEvent::WorkflowError { .. })
        ));
    }

    #[test]
    fn test_validate_workflow() {
        let dir = TempDir::new().unwrap();
        let config = OrquestraConfig::default();

        let good = write(&dir, "good.toml", BLOG);
        assert_eq!(validate_workflow(&good, &config, &MockHandler::default()), 0);

        let cyclic = write(
            &dir,
            "cyclic.toml",
            &BLOG.replace(
                "instruction = \"Outline a post about borrowing\"",
                "instruction = \"Outline\"\ndepends_on = [\"draft\"]",
            ),
        );
        let handler = MockHandler::default();
        assert_eq!(validate_workflow(&cyclic, &config, &handler), 1);
        assert!(handler.events().iter().any(|e| matches!(
            e,
            OutputEvent::WorkflowError { kind: Some(kind), .. } if kind == "cycle-detected"
        )));
    }

    #[test]
    fn test_validate_checks_instructions() {
        let dir = TempDir::new().unwrap();
        let config = OrquestraConfig::default();

        let broken = write(
            &dir,
            "broken.toml",
            &BLOG.replace("{{ tasks.outline.output }}", "{{ tasks.outline.output"),
        );
        assert_eq!(validate_workflow(&broken, &config, &MockHandler::default()), 1);

        let loose = write(
            &dir,
            "loose.toml",
            &BLOG.replace("Outline a post about borrowing", "Outline {{ topic }}"),
        );
        let handler = MockHandler::default();
        assert_eq!(validate_workflow(&loose, &config, &handler), 0);
        assert!(handler.events().iter().any(|e| matches!(
            e,
            OutputEvent::Info { message } if message.contains("references 'topic'")
        )));
    }

    #[test]
    fn test_check_instructions_batch_visibility() {
        let workflow = crate::config::parse_workflow(
            &BLOG.replace(
                "Outline a post about borrowing",
                "{% if tasks.draft is defined %}{{ tasks.draft.output }}{% endif %}",
            ),
            crate::config::WorkflowFormat::Toml,
        )
        .unwrap();
        let plan = resolve_task_order(&workflow.tasks).unwrap();

        let (errors, warnings) = check_instructions(&workflow, &plan);
        assert!(errors.is_empty());
        // draft runs after outline, so outline can't see it; draft's own
        // reference to outline is fine
        assert!(!warnings.is_empty());
        assert!(warnings.iter().all(|w| w.starts_with("task 'outline'")));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "blog.toml", &BLOG.replace("\"openai\"", "\"mistral\""));
        let handler = MockHandler::default();

        assert_eq!(
            validate_workflow(&path, &OrquestraConfig::default(), &handler),
            1
        );
        let message = match handler.events().first() {
            Some(OutputEvent::WorkflowError { error, .. }) => error.clone(),
            other => panic!("unexpected event: {:?}", other),
        };
        assert!(message.contains("unknown provider 'mistral'"));
    }

    #[test]
    fn test_show_plan() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "blog.toml", BLOG);
        let handler = MockHandler::default();

        assert_eq!(show_plan(&path, &OrquestraConfig::default(), &handler), 0);
        assert!(handler.events().contains(&OutputEvent::BatchPlan {
            batches: vec![vec!["outline".into()], vec!["draft".into()]],
        }));
    }

    #[test]
    fn test_list_providers() {
        let mut config = OrquestraConfig::default();
        config.providers.insert(
            "anthropic".into(),
            ProviderConfig {
                enabled: false,
                ..Default::default()
            },
        );
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                api_key_env: Some("ORQUESTRA_TEST_UNSET_LIST_KEY".into()),
                ..Default::default()
            },
        );

        let handler = MockHandler::default();
        list_providers(&config, &handler);

        assert_eq!(
            handler.events(),
            vec![
                OutputEvent::Provider {
                    name: "echo".into(),
                    ready: true,
                    detail: "no credentials needed".into(),
                },
                OutputEvent::Provider {
                    name: "openai".into(),
                    ready: false,
                    detail: "ORQUESTRA_TEST_UNSET_LIST_KEY not set".into(),
                },
                OutputEvent::Provider {
                    name: "anthropic".into(),
                    ready: false,
                    detail: "disabled".into(),
                },
            ]
        );
    }

    #[test]
    fn test_flags_override_defaults() {
        let mut config = OrquestraConfig::default();
        config.defaults.max_concurrent = Some(8);

        let options = RunFlags::default().options(&config);
        assert!(!options.parallel);
        assert_eq!(options.max_concurrent, Some(8));

        let flags = RunFlags {
            parallel: true,
            max_concurrent: Some(2),
            ..Default::default()
        };
        assert_eq!(
            flags.options(&config),
            RunOptions {
                parallel: true,
                max_concurrent: Some(2)
            }
        );
    }
}
