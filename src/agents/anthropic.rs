//! Anthropic messages API executor

use super::types::{AgentError, AgentExecutor, map_http_error, map_request_error};
use crate::config::{Agent, ProviderConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub const PROVIDER: &str = "anthropic";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
pub(crate) const DEFAULT_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Executor for Anthropic's Claude models
#[derive(Debug, Clone)]
pub struct AnthropicExecutor {
    base_url: String,
    api_key: String,
    max_tokens: u32,
    timeout: Duration,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: Option<u32>,
    output_tokens: Option<u32>,
}

impl AnthropicExecutor {
    /// Create an executor from provider config, reading the API key from the environment
    pub fn from_config(config: &ProviderConfig) -> Result<Self, AgentError> {
        let api_key_env = config.api_key_env_or(DEFAULT_API_KEY_ENV);
        let api_key = std::env::var(api_key_env).map_err(|_| {
            AgentError::auth(format!("missing environment variable: {}", api_key_env))
        })?;

        let timeout = Duration::from_secs(config.timeout);
        Ok(Self {
            base_url: config.base_url_or(DEFAULT_BASE_URL).to_string(),
            api_key,
            max_tokens: config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            timeout,
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| {
                    AgentError::unavailable(format!("failed to create HTTP client: {}", e))
                })?,
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/messages", self.base_url.trim_end_matches('/'))
    }

    fn build_request<'a>(&self, agent: &'a Agent, instruction: &'a str) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &agent.model,
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content: instruction,
            }],
        }
    }
}

/// Join the text blocks of a response, refusing empty answers
fn extract_text(response: MessagesResponse) -> Result<String, AgentError> {
    let text = response
        .content
        .into_iter()
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("\n");

    if text.trim().is_empty() {
        Err(AgentError::empty_response(PROVIDER))
    } else {
        Ok(text)
    }
}

#[async_trait]
impl AgentExecutor for AnthropicExecutor {
    async fn execute(&self, agent: &Agent, instruction: &str) -> Result<String, AgentError> {
        let start = Instant::now();

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&self.build_request(agent, instruction))
            .send()
            .await
            .map_err(|e| map_request_error(e, start.elapsed()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, &body, self.timeout));
        }

        let message: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AgentError::parse(format!("failed to parse response: {}", e)))?;

        if let Some(ref usage) = message.usage {
            tracing::debug!(
                agent = %agent.name,
                model = %agent.model,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Anthropic message"
            );
        }

        extract_text(message)
    }

    fn provider(&self) -> &str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor() -> AnthropicExecutor {
        AnthropicExecutor {
            base_url: "https://api.anthropic.com/v1/".into(),
            api_key: "test".into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: Duration::from_secs(30),
            client: reqwest::Client::new(),
        }
    }

    #[test]
    fn test_messages_url() {
        assert_eq!(
            executor().messages_url(),
            "https://api.anthropic.com/v1/messages"
        );
    }

    #[test]
    fn test_request_body() {
        let agent = Agent::new("editor", PROVIDER, "claude-sonnet-4-20250514");
        let body = serde_json::to_value(executor().build_request(&agent, "Edit this")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "model": "claude-sonnet-4-20250514",
                "max_tokens": 1024,
                "messages": [{"role": "user", "content": "Edit this"}]
            })
        );
    }

    #[test]
    fn test_extract_text_joins_blocks() {
        let response: MessagesResponse = serde_json::from_value(serde_json::json!({
            "content": [
                {"type": "text", "text": "First"},
                {"type": "tool_use", "id": "x"},
                {"type": "text", "text": "Second"}
            ],
            "usage": {"input_tokens": 5, "output_tokens": 4}
        }))
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "First\nSecond");
    }

    #[test]
    fn test_extract_text_empty() {
        let response: MessagesResponse =
            serde_json::from_value(serde_json::json!({"content": []})).unwrap();
        assert!(extract_text(response).unwrap_err().is_empty_response());
    }

    #[test]
    fn test_from_config_missing_key() {
        let config = ProviderConfig {
            api_key_env: Some("ORQUESTRA_TEST_UNSET_ANTHROPIC_KEY".into()),
            ..Default::default()
        };
        let err = AnthropicExecutor::from_config(&config).unwrap_err();
        assert!(matches!(err, AgentError::Auth { .. }));
    }
}
