//! OpenAI chat completions executor

use super::types::{AgentError, AgentExecutor, map_http_error, map_request_error};
use crate::config::{Agent, ProviderConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub const PROVIDER: &str = "openai";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub(crate) const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Executor for OpenAI-compatible chat completion APIs
#[derive(Debug, Clone)]
pub struct OpenAiExecutor {
    /// Base URL for the API
    base_url: String,

    /// API key
    api_key: String,

    /// Default timeout
    timeout: Duration,

    /// HTTP client
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
}

impl OpenAiExecutor {
    /// Create an executor from provider config, reading the API key from the environment
    pub fn from_config(config: &ProviderConfig) -> Result<Self, AgentError> {
        let api_key_env = config.api_key_env_or(DEFAULT_API_KEY_ENV);
        let api_key = std::env::var(api_key_env).map_err(|_| {
            AgentError::auth(format!("missing environment variable: {}", api_key_env))
        })?;

        Self::new(config.base_url_or(DEFAULT_BASE_URL), api_key)?
            .with_timeout(Duration::from_secs(config.timeout))
    }

    /// Create an executor with explicit parameters
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, AgentError> {
        let timeout = Duration::from_secs(300);
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout,
            client: build_client(timeout)?,
        })
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, AgentError> {
        self.timeout = timeout;
        self.client = build_client(timeout)?;
        Ok(self)
    }

    /// Build the chat completion URL
    fn chat_completion_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client, AgentError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AgentError::unavailable(format!("failed to create HTTP client: {}", e)))
}

fn build_request<'a>(agent: &'a Agent, instruction: &'a str) -> ChatCompletionRequest<'a> {
    ChatCompletionRequest {
        model: &agent.model,
        messages: vec![Message {
            role: "user",
            content: instruction,
        }],
    }
}

/// Pull the first choice's text, refusing empty answers
fn extract_text(completion: ChatCompletionResponse) -> Result<String, AgentError> {
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| AgentError::empty_response(PROVIDER))
}

#[async_trait]
impl AgentExecutor for OpenAiExecutor {
    async fn execute(&self, agent: &Agent, instruction: &str) -> Result<String, AgentError> {
        let start = Instant::now();
        let body = build_request(agent, instruction);

        let response = self
            .client
            .post(self.chat_completion_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_request_error(e, start.elapsed()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, &body, self.timeout));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AgentError::parse(format!("failed to parse response: {}", e)))?;

        if let Some(ref usage) = completion.usage {
            tracing::debug!(
                agent = %agent.name,
                model = completion.model.as_deref().unwrap_or(&agent.model),
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "OpenAI completion"
            );
        }

        extract_text(completion)
    }

    fn provider(&self) -> &str {
        PROVIDER
    }
}
