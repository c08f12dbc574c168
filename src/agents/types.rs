//! Core types and traits for agent execution

use crate::config::Agent;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Error types that can occur while an agent executes an instruction
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    /// The provider answered without usable text
    #[error("received an empty response from {provider}")]
    EmptyResponse { provider: String },

    /// Request timed out
    #[error("timeout after {elapsed:?}")]
    Timeout { elapsed: Duration },

    /// Rate limited by the provider
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimit { retry_after: Option<Duration> },

    /// Authentication failed or credentials are missing
    #[error("authentication failed: {message}")]
    Auth { message: String },

    /// Network error or server-side failure
    #[error("network error: {message}")]
    Network { message: String },

    /// Failed to parse response
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Request rejected by the provider (bad model, bad payload)
    #[error("request rejected: {message}")]
    Rejected { message: String },

    /// Provider could not be set up
    #[error("provider unavailable: {message}")]
    Unavailable { message: String },
}

impl AgentError {
    /// Create an empty response error
    pub fn empty_response(provider: impl Into<String>) -> Self {
        Self::EmptyResponse {
            provider: provider.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(elapsed: Duration) -> Self {
        Self::Timeout { elapsed }
    }

    /// Create a rate limit error
    pub fn rate_limit(retry_after: Option<Duration>) -> Self {
        Self::RateLimit { retry_after }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create an unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Whether the provider gave back nothing usable
    pub fn is_empty_response(&self) -> bool {
        matches!(self, Self::EmptyResponse { .. })
    }
}

/// Capability that runs an instruction on behalf of an agent
///
/// One implementation per provider. Implementations own their transport
/// and credentials and must be stateless with respect to the workflow
/// that invokes them.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    /// Execute an instruction and return the agent's output
    ///
    /// Returns [`AgentError::EmptyResponse`] instead of an empty string.
    async fn execute(&self, agent: &Agent, instruction: &str) -> Result<String, AgentError>;

    /// Provider key this executor serves
    fn provider(&self) -> &str;
}

/// Map an HTTP error status to an AgentError
pub(crate) fn map_http_error(
    status: reqwest::StatusCode,
    body: &str,
    timeout: Duration,
) -> AgentError {
    match status.as_u16() {
        401 | 403 => AgentError::auth(format!("HTTP {}: {}", status, body)),
        429 => AgentError::rate_limit(parse_retry_after(body)),
        408 | 504 => AgentError::timeout(timeout),
        400..=499 => AgentError::Rejected {
            message: format!("HTTP {}: {}", status, body),
        },
        500..=599 => AgentError::network(format!("HTTP {}: {}", status, body)),
        _ => AgentError::network(format!("unexpected HTTP {}: {}", status, body)),
    }
}

/// Map a transport error from reqwest
pub(crate) fn map_request_error(err: reqwest::Error, elapsed: Duration) -> AgentError {
    if err.is_timeout() {
        AgentError::timeout(elapsed)
    } else if err.is_connect() {
        AgentError::network(format!("connection failed: {}", err))
    } else {
        AgentError::network(format!("request failed: {}", err))
    }
}

/// Try to parse retry-after from an error response body
fn parse_retry_after(body: &str) -> Option<Duration> {
    let json = serde_json::from_str::<serde_json::Value>(body).ok()?;
    let seconds = json.get("retry_after").and_then(|v| v.as_f64())?;
    Duration::try_from_secs_f64(seconds).ok()
}
