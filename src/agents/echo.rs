//! Echo executor for dry runs

use super::types::{AgentError, AgentExecutor};
use crate::config::Agent;
use async_trait::async_trait;

pub const PROVIDER: &str = "echo";

/// Returns the rendered instruction as the agent's output
///
/// Needs no credentials or network, so it backs `--dry-run` and local
/// testing of templates and dependency wiring.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoExecutor;

#[async_trait]
impl AgentExecutor for EchoExecutor {
    async fn execute(&self, agent: &Agent, instruction: &str) -> Result<String, AgentError> {
        if instruction.trim().is_empty() {
            return Err(AgentError::empty_response(PROVIDER));
        }
        tracing::debug!(agent = %agent.name, chars = instruction.len(), "Echoing instruction");
        Ok(instruction.to_string())
    }

    fn provider(&self) -> &str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_returns_instruction() {
        let agent = Agent::new("writer", "openai", "gpt-4o");
        let output = EchoExecutor.execute(&agent, "Write a haiku").await.unwrap();
        assert_eq!(output, "Write a haiku");
    }

    #[tokio::test]
    async fn test_echo_blank_instruction_is_empty_response() {
        let agent = Agent::new("writer", "echo", "none");
        let err = EchoExecutor.execute(&agent, "  ").await.unwrap_err();
        assert!(err.is_empty_response());
    }
}
