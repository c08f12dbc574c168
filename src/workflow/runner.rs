//! Workflow runner - drives batches of tasks through their agents

use super::error::{RunError, WorkflowError};
use super::scheduler::resolve_task_order;
use super::state::ExecutionContext;
use crate::agents::{AgentError, AgentExecutor, ExecutorCache, ExecutorRegistry};
use crate::config::{Agent, Defaults, OrquestraConfig, Task, Workflow};
use crate::template::{RenderContext, TemplateEngine};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

/// How the tasks of one batch are dispatched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Dispatch the tasks of a batch concurrently
    pub parallel: bool,

    /// Upper bound on concurrent dispatches; unbounded when unset
    pub max_concurrent: Option<usize>,
}

impl From<&Defaults> for RunOptions {
    fn from(defaults: &Defaults) -> Self {
        Self {
            parallel: defaults.parallel,
            max_concurrent: defaults.max_concurrent,
        }
    }
}

/// A task ready to be handed to its executor
struct Dispatch<'w> {
    task: &'w Task,
    agent: &'w Agent,
    executor: Arc<dyn AgentExecutor>,
    instruction: String,
}

/// Runs workflows batch by batch
///
/// The first failure aborts the run. Outputs are only visible to tasks of
/// later batches: every instruction of a batch is rendered against the
/// context as it stood when the batch started.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    registry: Arc<ExecutorRegistry>,
    engine: TemplateEngine,
    options: RunOptions,
}

impl Orchestrator {
    /// Create an orchestrator over a provider registry
    pub fn new(registry: Arc<ExecutorRegistry>) -> Self {
        Self {
            registry,
            engine: TemplateEngine::new(),
            options: RunOptions::default(),
        }
    }

    /// Orchestrator with the built-in providers and defaults from config
    pub fn from_config(config: &OrquestraConfig) -> Self {
        Self::new(Arc::new(ExecutorRegistry::from_config(config)))
            .with_options(RunOptions::from(&config.defaults))
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> RunOptions {
        self.options
    }

    pub fn registry(&self) -> &ExecutorRegistry {
        &self.registry
    }

    /// Run a workflow to completion
    ///
    /// On success the context holds one output per task. On failure the
    /// error carries the outputs completed so far.
    pub async fn run(&self, workflow: &Workflow) -> Result<ExecutionContext, RunError> {
        let start = Instant::now();
        let mut context = ExecutionContext::new();

        match self.execute(workflow, &mut context).await {
            Ok(()) => {
                tracing::info!(
                    workflow = %workflow.name,
                    tasks = context.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Workflow completed"
                );
                Ok(context)
            }
            Err(error) => {
                tracing::error!(
                    workflow = %workflow.name,
                    task = error.task(),
                    kind = %error.kind(),
                    completed = context.len(),
                    error = %error,
                    "Workflow failed"
                );
                Err(RunError {
                    workflow: workflow.name.clone(),
                    error,
                    context,
                })
            }
        }
    }

    async fn execute(
        &self,
        workflow: &Workflow,
        context: &mut ExecutionContext,
    ) -> Result<(), WorkflowError> {
        let agents = workflow.agent_map();
        let plan = resolve_task_order(&workflow.tasks)?;
        let mut executors = self.registry.cache();

        tracing::info!(
            workflow = %workflow.name,
            tasks = plan.task_count(),
            batches = plan.len(),
            parallel = self.options.parallel,
            "Starting workflow"
        );

        for (index, batch) in plan.iter().enumerate() {
            let names: Vec<&str> = batch.iter().map(|t| t.name.as_str()).collect();
            tracing::info!(batch = index + 1, tasks = ?names, "Starting batch");

            let snapshot = snapshot_context(batch, context)?;

            if self.options.parallel && batch.len() > 1 {
                let dispatches = batch
                    .iter()
                    .map(|&task| self.prepare(task, &agents, &mut executors, &snapshot))
                    .collect::<Result<Vec<_>, _>>()?;
                self.dispatch_concurrent(dispatches, context).await?;
            } else {
                for &task in batch {
                    let dispatch = self.prepare(task, &agents, &mut executors, &snapshot)?;
                    let (task, output) = invoke(dispatch).await?;
                    context.record(task, output);
                }
            }
        }

        Ok(())
    }

    /// Resolve a task's agent and executor and render its instruction
    fn prepare<'w>(
        &self,
        task: &'w Task,
        agents: &HashMap<&str, &'w Agent>,
        executors: &mut ExecutorCache<'_>,
        snapshot: &RenderContext,
    ) -> Result<Dispatch<'w>, WorkflowError> {
        let agent = agents.get(task.agent.as_str()).copied().ok_or_else(|| {
            WorkflowError::UnknownAgent {
                task: task.name.clone(),
                agent: task.agent.clone(),
            }
        })?;

        let instruction = self
            .engine
            .render_context(&task.instruction, snapshot)
            .map_err(|source| WorkflowError::Template {
                task: task.name.clone(),
                source,
            })?;

        let executor = executors
            .get(&agent.provider)
            .map_err(|e| WorkflowError::resolve(&task.name, e))?;

        Ok(Dispatch {
            task,
            agent,
            executor,
            instruction,
        })
    }

    /// Run a batch concurrently, recording outputs as they arrive
    ///
    /// Returning early drops the remaining futures, which cancels them.
    async fn dispatch_concurrent(
        &self,
        dispatches: Vec<Dispatch<'_>>,
        context: &mut ExecutionContext,
    ) -> Result<(), WorkflowError> {
        let limiter = self.options.max_concurrent.map(|n| Semaphore::new(n.max(1)));
        let limiter = limiter.as_ref();

        let mut pending: FuturesUnordered<_> = dispatches
            .into_iter()
            .map(|dispatch| invoke_limited(dispatch, limiter))
            .collect();

        while let Some(result) = pending.next().await {
            match result {
                Ok((task, output)) => {
                    context.record(task, output);
                }
                Err(e) => {
                    if !pending.is_empty() {
                        tracing::warn!(
                            task = e.task(),
                            cancelled = pending.len(),
                            "Cancelling in-flight tasks"
                        );
                    }
                    return Err(e);
                }
            }
        }

        Ok(())
    }
}

/// Context as it stood when a batch started
fn snapshot_context(
    batch: &[&Task],
    context: &ExecutionContext,
) -> Result<RenderContext, WorkflowError> {
    RenderContext::from_serialize(context).map_err(|source| WorkflowError::Template {
        task: batch.first().map(|t| t.name.clone()).unwrap_or_default(),
        source,
    })
}

/// Wait for a concurrency permit, then invoke
async fn invoke_limited<'w>(
    dispatch: Dispatch<'w>,
    limiter: Option<&Semaphore>,
) -> Result<(&'w str, String), WorkflowError> {
    let _permit = match limiter {
        Some(sem) => Some(sem.acquire().await.map_err(|_| WorkflowError::Agent {
            task: dispatch.task.name.clone(),
            source: AgentError::unavailable("concurrency limiter closed"),
        })?),
        None => None,
    };
    invoke(dispatch).await
}

/// Hand one task to its executor
async fn invoke<'w>(dispatch: Dispatch<'w>) -> Result<(&'w str, String), WorkflowError> {
    let Dispatch {
        task,
        agent,
        executor,
        instruction,
    } = dispatch;
    let start = Instant::now();

    tracing::info!(
        task = %task.name,
        agent = %agent.name,
        provider = executor.provider(),
        "Starting task"
    );
    tracing::debug!(task = %task.name, instruction = %instruction, "Rendered instruction");

    let output = executor
        .execute(agent, &instruction)
        .await
        .map_err(|source| WorkflowError::Agent {
            task: task.name.clone(),
            source,
        })?;

    tracing::info!(
        task = %task.name,
        agent = %agent.name,
        provider = executor.provider(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        output_len = output.len(),
        "Task completed"
    );

    Ok((task.name.as_str(), output))
}
