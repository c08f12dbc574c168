//! Provider configuration for LLM APIs

use serde::{Deserialize, Serialize};

/// Configuration for a single provider
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Whether this provider is registered
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Environment variable holding the API key
    pub api_key_env: Option<String>,

    /// Base URL override for the API
    pub base_url: Option<String>,

    /// Timeout in seconds for requests
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Maximum tokens to generate (providers that require it)
    pub max_tokens: Option<u32>,
}

fn default_enabled() -> bool {
    true
}

pub(crate) fn default_timeout() -> u64 {
    300 // 5 minutes
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key_env: None,
            base_url: None,
            timeout: default_timeout(),
            max_tokens: None,
        }
    }
}

impl ProviderConfig {
    /// API key variable, falling back to the provider's conventional one
    pub fn api_key_env_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.api_key_env.as_deref().unwrap_or(fallback)
    }

    /// Base URL, falling back to the provider's public endpoint
    pub fn base_url_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.base_url.as_deref().unwrap_or(fallback)
    }
}
