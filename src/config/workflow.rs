//! Workflow, agent and task definitions

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// A configured AI agent
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Agent {
    /// Agent name (unique within workflow)
    pub name: String,

    /// Provider key selecting the executor, e.g. "openai" or "anthropic"
    pub provider: String,

    /// Model name, passed through to the provider untouched
    pub model: String,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            provider: provider.into(),
            model: model.into(),
        }
    }
}

/// A single task executed by an agent
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Task {
    /// Task name (unique within workflow)
    pub name: String,

    /// Name of the agent assigned to this task
    pub agent: String,

    /// Instruction template rendered against the execution context
    pub instruction: String,

    /// Free-form inputs. Reserved; not visible to templates.
    #[serde(default)]
    pub inputs: BTreeMap<String, serde_json::Value>,

    /// Tasks that must complete before this one starts
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl Task {
    pub fn new(
        name: impl Into<String>,
        agent: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            agent: agent.into(),
            instruction: instruction.into(),
            inputs: BTreeMap::new(),
            depends_on: Vec::new(),
        }
    }

    /// Add dependencies
    pub fn with_depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(deps.into_iter().map(Into::into));
        self
    }

    /// Add an input value
    pub fn with_input(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.inputs.insert(key.into(), value);
        self
    }
}

/// Full workflow definition
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Workflow {
    /// Workflow name
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,

    /// Agents available to tasks
    pub agents: Vec<Agent>,

    /// Tasks in this workflow
    pub tasks: Vec<Task>,
}

impl Workflow {
    /// Look up an agent by name
    pub fn agent(&self, name: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.name == name)
    }

    /// Look up a task by name
    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Map of agent name to agent
    pub fn agent_map(&self) -> HashMap<&str, &Agent> {
        self.agents.iter().map(|a| (a.name.as_str(), a)).collect()
    }

    /// Validate the workflow against the set of known providers
    ///
    /// Collects every problem rather than stopping at the first one.
    /// Cycles are left to the scheduler.
    pub fn validate<'p, I>(&self, known_providers: I) -> Result<(), Vec<String>>
    where
        I: IntoIterator<Item = &'p str>,
    {
        let known_providers: HashSet<&str> = known_providers.into_iter().collect();
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("workflow name is empty".to_string());
        }

        let mut seen_agents = HashSet::new();
        for agent in &self.agents {
            if agent.name.trim().is_empty() {
                errors.push("agent with empty name".to_string());
            }
            if !seen_agents.insert(agent.name.as_str()) {
                errors.push(format!("duplicate agent name: {}", agent.name));
            }
            if !known_providers.contains(agent.provider.as_str()) {
                errors.push(format!(
                    "agent '{}' uses unknown provider '{}'",
                    agent.name, agent.provider
                ));
            }
        }

        let mut seen_tasks = HashSet::new();
        for task in &self.tasks {
            if task.name.trim().is_empty() {
                errors.push("task with empty name".to_string());
            }
            if !seen_tasks.insert(task.name.as_str()) {
                errors.push(format!("duplicate task name: {}", task.name));
            }
            if !seen_agents.contains(task.agent.as_str()) {
                errors.push(format!(
                    "task '{}' uses unknown agent '{}'",
                    task.name, task.agent
                ));
            }
        }

        for task in &self.tasks {
            for dep in &task.depends_on {
                if !seen_tasks.contains(dep.as_str()) {
                    errors.push(format!(
                        "task '{}' depends on unknown task '{}'",
                        task.name, dep
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
