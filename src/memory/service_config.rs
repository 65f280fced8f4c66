//! Configuration for the external memory service

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

/// Memory service client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryServiceConfig {
    /// Enable/disable memory augmentation globally
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Memory service base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key (read from env MEMORY_API_KEY if not set)
    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum facts injected into one request context
    #[serde(default = "default_max_context_memories")]
    pub max_context_memories: usize,

    /// Minimum relevance score for retrieved facts
    #[serde(default = "default_min_relevance")]
    pub min_relevance_score: f32,

    /// Extract candidate facts from new user messages
    #[serde(default = "default_extract_enabled")]
    pub extract_from_messages: bool,

    /// Messages shorter than this are never scanned for facts
    #[serde(default = "default_min_extraction_chars")]
    pub min_extraction_chars: usize,

    /// Blend retrieved facts into outgoing context
    #[serde(default = "default_enhance_enabled")]
    pub enhance_context: bool,

    /// Retry attempts for search calls
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: usize,

    /// Base backoff in milliseconds between retries
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

// Default value functions
fn default_enabled() -> bool {
    true
}
fn default_base_url() -> String {
    "https://api.mem0.ai".to_string()
}
fn default_timeout_ms() -> u64 {
    5000
}
fn default_max_context_memories() -> usize {
    10
}
fn default_min_relevance() -> f32 {
    0.7
}
fn default_extract_enabled() -> bool {
    true
}
fn default_min_extraction_chars() -> usize {
    20
}
fn default_enhance_enabled() -> bool {
    true
}
fn default_retry_attempts() -> usize {
    2
}
fn default_retry_backoff_ms() -> u64 {
    200
}

impl Default for MemoryServiceConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            base_url: default_base_url(),
            api_key: None,
            timeout_ms: default_timeout_ms(),
            max_context_memories: default_max_context_memories(),
            min_relevance_score: default_min_relevance(),
            extract_from_messages: default_extract_enabled(),
            min_extraction_chars: default_min_extraction_chars(),
            enhance_context: default_enhance_enabled(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl MemoryServiceConfig {
    /// Override fields from environment variables
    pub fn from_env(mut self) -> Self {
        if let Ok(val) = std::env::var("MEMORY_ENABLED") {
            self.enabled = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("MEMORY_SERVICE_URL") {
            self.base_url = val;
        }

        if let Ok(val) = std::env::var("MEMORY_API_KEY") {
            self.api_key = Some(SecretString::new(val));
        }

        if let Ok(val) = std::env::var("MEMORY_TIMEOUT_MS") {
            if let Ok(ms) = val.parse() {
                self.timeout_ms = ms;
            }
        }

        if let Ok(val) = std::env::var("MEMORY_MAX_CONTEXT_MEMORIES") {
            if let Ok(max) = val.parse() {
                self.max_context_memories = max;
            }
        }

        if let Ok(val) = std::env::var("MEMORY_MIN_RELEVANCE") {
            if let Ok(score) = val.parse() {
                self.min_relevance_score = score;
            }
        }

        if let Ok(val) = std::env::var("MEMORY_RETRY_ATTEMPTS") {
            if let Ok(attempts) = val.parse() {
                self.retry_attempts = attempts;
            }
        }

        self
    }

    /// Set the API key programmatically (embedding callers, tests)
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(key.into()));
        self
    }

    /// Whether the adapter has what it needs to reach the service
    pub fn configured(&self) -> bool {
        self.enabled && self.api_key.is_some()
    }

    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get retry backoff as Duration
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub(crate) fn auth_token(&self) -> Option<&str> {
        self.api_key.as_ref().map(|k| k.expose_secret().as_str())
    }
}
