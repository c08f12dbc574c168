//! Provider registry and run-scoped executor cache

use super::anthropic::{self, AnthropicExecutor};
use super::echo::{self, EchoExecutor};
use super::openai::{self, OpenAiExecutor};
use super::types::{AgentError, AgentExecutor};
use crate::config::{OrquestraConfig, ProviderConfig};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Builds an executor on first use of a provider
pub type ExecutorFactory =
    Arc<dyn Fn() -> Result<Arc<dyn AgentExecutor>, AgentError> + Send + Sync>;

/// Errors resolving a provider to an executor
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no executor registered for provider '{provider}'")]
    UnknownProvider { provider: String },

    #[error("failed to initialize provider '{provider}': {source}")]
    Init {
        provider: String,
        #[source]
        source: AgentError,
    },
}

/// Maps provider keys to executor factories
///
/// Factories are cheap to hold; the executors they build (HTTP clients,
/// credentials) are created lazily through an [`ExecutorCache`].
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
    factories: BTreeMap<String, ExecutorFactory>,
}

impl fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("providers", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ExecutorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in providers enabled in the config
    pub fn from_config(config: &OrquestraConfig) -> Self {
        let mut registry = Self::new();

        if config.provider_enabled(openai::PROVIDER) {
            let settings = config.provider(openai::PROVIDER);
            registry.register(openai::PROVIDER, move || {
                Ok(Arc::new(OpenAiExecutor::from_config(&settings)?) as Arc<dyn AgentExecutor>)
            });
        }

        if config.provider_enabled(anthropic::PROVIDER) {
            let settings = config.provider(anthropic::PROVIDER);
            registry.register(anthropic::PROVIDER, move || {
                Ok(Arc::new(AnthropicExecutor::from_config(&settings)?) as Arc<dyn AgentExecutor>)
            });
        }

        if config.provider_enabled(echo::PROVIDER) {
            registry.register_executor(echo::PROVIDER, Arc::new(EchoExecutor));
        }

        registry
    }

    /// Register a factory for a provider, replacing any previous one
    pub fn register<F>(&mut self, provider: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Arc<dyn AgentExecutor>, AgentError> + Send + Sync + 'static,
    {
        self.factories.insert(provider.into(), Arc::new(factory));
    }

    /// Register an already built executor for a provider
    pub fn register_executor(&mut self, provider: impl Into<String>, executor: Arc<dyn AgentExecutor>) {
        self.register(provider, move || Ok(executor.clone()));
    }

    /// Registered provider keys, sorted
    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Whether a provider is registered
    pub fn contains(&self, provider: &str) -> bool {
        self.factories.contains_key(provider)
    }

    /// Same providers, all answered by the echo executor
    pub fn dry_run(&self) -> Self {
        let mut registry = Self::new();
        for provider in self.factories.keys() {
            registry.register_executor(provider.clone(), Arc::new(EchoExecutor));
        }
        registry
    }

    /// Build a fresh executor for a provider
    pub fn instantiate(&self, provider: &str) -> Result<Arc<dyn AgentExecutor>, ResolveError> {
        let factory = self
            .factories
            .get(provider)
            .ok_or_else(|| ResolveError::UnknownProvider {
                provider: provider.to_string(),
            })?;

        factory().map_err(|source| ResolveError::Init {
            provider: provider.to_string(),
            source,
        })
    }

    /// Start a cache scoped to one run
    pub fn cache(&self) -> ExecutorCache<'_> {
        ExecutorCache {
            registry: self,
            instances: HashMap::new(),
        }
    }
}

/// Environment variable a built-in provider reads its API key from
///
/// `None` for providers that need no credentials.
pub fn credential_env<'c>(provider: &str, config: &'c ProviderConfig) -> Option<&'c str> {
    match provider {
        openai::PROVIDER => Some(config.api_key_env_or(openai::DEFAULT_API_KEY_ENV)),
        anthropic::PROVIDER => Some(config.api_key_env_or(anthropic::DEFAULT_API_KEY_ENV)),
        _ => None,
    }
}

/// Lazily instantiated executors for the lifetime of a run
///
/// Each provider is instantiated at most once per cache.
pub struct ExecutorCache<'r> {
    registry: &'r ExecutorRegistry,
    instances: HashMap<String, Arc<dyn AgentExecutor>>,
}

impl ExecutorCache<'_> {
    /// Get the executor for a provider, instantiating it on first use
    pub fn get(&mut self, provider: &str) -> Result<Arc<dyn AgentExecutor>, ResolveError> {
        if let Some(executor) = self.instances.get(provider) {
            return Ok(executor.clone());
        }

        let executor = self.registry.instantiate(provider)?;
        tracing::debug!(provider, "Instantiated executor");
        self.instances.insert(provider.to_string(), executor.clone());
        Ok(executor)
    }

    /// Number of providers instantiated so far
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
