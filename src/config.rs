//! Crate configuration loaded from file and environment

use crate::context::window::WindowOptions;
use crate::error::{ContextError, Result};
use crate::memory::service_config::MemoryServiceConfig;
use serde::Deserialize;
use std::path::Path;

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub context: WindowOptions,

    #[serde(default)]
    pub memory: MemoryServiceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from an optional TOML file, with environment
    /// overrides (prefix `CHAT_CONTEXT`, `__` as the section separator,
    /// e.g. `CHAT_CONTEXT_CONTEXT__MAX_TOKENS=8000`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let raw = builder
            .add_source(config::Environment::with_prefix("CHAT_CONTEXT").separator("__"))
            .build()
            .map_err(|e| ContextError::Configuration(e.to_string()))?;

        let mut loaded: Config = raw
            .try_deserialize()
            .map_err(|e| ContextError::Configuration(e.to_string()))?;

        // The memory section additionally honors its own env vars
        // (MEMORY_API_KEY and friends) so keys stay out of config files.
        loaded.memory = loaded.memory.from_env();

        Ok(loaded)
    }
}
