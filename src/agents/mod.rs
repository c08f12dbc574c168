//! Agent execution
//!
//! Provides the executor capability agents run through, one implementation
//! per provider, and the registry that resolves provider keys to executors.
//!
//! # Example
//!
//! ```ignore
//! use orquestra::agents::ExecutorRegistry;
//! use orquestra::config::{Agent, OrquestraConfig};
//!
//! let registry = ExecutorRegistry::from_config(&OrquestraConfig::load(None)?);
//! let mut cache = registry.cache();
//!
//! let agent = Agent::new("writer", "openai", "gpt-4o");
//! let executor = cache.get(&agent.provider)?;
//! let output = executor.execute(&agent, "Write a haiku about borrowing").await?;
//! ```

mod anthropic;
mod echo;
mod openai;
mod registry;
mod types;

pub use anthropic::AnthropicExecutor;
pub use echo::EchoExecutor;
pub use openai::OpenAiExecutor;
pub use registry::{ExecutorCache, ExecutorFactory, ExecutorRegistry, ResolveError, credential_env};
pub use types::{AgentError, AgentExecutor};
