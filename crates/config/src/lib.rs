//! Configuration management for the documentation chatbot
//!
//! Supports loading configuration from:
//! - TOML/YAML files under `config/`
//! - Environment variables (`DOCBOT__` prefix, `__` separator)

pub mod constants;
pub mod chatbot;
pub mod services;
pub mod settings;

pub use chatbot::{
    EscalationConfig, GateConfig, MemoryConfig, RetrievalConfig, UnansweredLogConfig,
};
pub use services::{EmbeddingSettings, LlmSettings, VectorStoreSettings};
pub use settings::{
    load_settings, ObservabilityConfig, RuntimeEnvironment, ServerConfig, Settings, ENV_PREFIX,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for docbot_core::Error {
    fn from(err: ConfigError) -> Self {
        docbot_core::Error::Config(err.to_string())
    }
}
