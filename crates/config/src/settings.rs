//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::chatbot::{
    EscalationConfig, GateConfig, MemoryConfig, RetrievalConfig, UnansweredLogConfig,
};
use crate::services::{EmbeddingSettings, LlmSettings, VectorStoreSettings};
use crate::ConfigError;

/// Prefix of environment overrides (`DOCBOT__GATE__SIMILARITY_THRESHOLD=0.75`)
pub const ENV_PREFIX: &str = "DOCBOT";

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub llm: LlmSettings,

    #[serde(default)]
    pub embedding: EmbeddingSettings,

    #[serde(default)]
    pub vector_store: VectorStoreSettings,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub gate: GateConfig,

    #[serde(default)]
    pub escalation: EscalationConfig,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub unanswered_log: UnansweredLogConfig,
}

impl Settings {
    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_retrieval()?;
        self.validate_gate()?;
        self.validate_conversation()?;
        self.validate_server()?;

        if self.environment.is_production() && self.llm.api_key.is_none() {
            tracing::warn!("No LLM API key configured for production");
        }

        Ok(())
    }

    fn validate_retrieval(&self) -> Result<(), ConfigError> {
        let r = &self.retrieval;

        check_unit_range("retrieval.hybrid_alpha", r.hybrid_alpha)?;
        check_unit_range("retrieval.distance_threshold", r.distance_threshold)?;
        check_unit_range("retrieval.permissive_distance", r.permissive_distance)?;

        if r.search_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retrieval.search_limit".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if r.keyword_query_terms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retrieval.keyword_query_terms".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    fn validate_gate(&self) -> Result<(), ConfigError> {
        let g = &self.gate;

        check_unit_range("gate.similarity_threshold", g.similarity_threshold)?;

        for (field, value) in [
            ("gate.normalization_relief", g.normalization_relief),
            ("gate.anchor_relief", g.anchor_relief),
            ("gate.max_relief", g.max_relief),
        ] {
            if value < 0.0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    message: format!("Must not be negative, got {}", value),
                });
            }
        }

        if g.context_chars == 0 {
            return Err(ConfigError::InvalidValue {
                field: "gate.context_chars".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    fn validate_conversation(&self) -> Result<(), ConfigError> {
        if self.escalation.threshold == 0 {
            return Err(ConfigError::InvalidValue {
                field: "escalation.threshold".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if self.memory.max_history_messages == 0 {
            return Err(ConfigError::InvalidValue {
                field: "memory.max_history_messages".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }

        let base = &self.server.base_path;
        if !base.is_empty() && (!base.starts_with('/') || base.ends_with('/')) {
            return Err(ConfigError::InvalidValue {
                field: "server.base_path".to_string(),
                message: format!("Must start with '/' and not end with '/', got {}", base),
            });
        }

        Ok(())
    }
}

fn check_unit_range(field: &str, value: f32) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            message: format!("Must be between 0.0 and 1.0, got {}", value),
        });
    }
    Ok(())
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed origins; empty falls back to localhost
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Optional mount prefix such as `/chatbotia`
    #[serde(default)]
    pub base_path: String,

    /// Mount `/debug/search`
    #[serde(default)]
    pub debug_endpoints: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: true,
            cors_origins: Vec::new(),
            base_path: String::new(),
            debug_endpoints: false,
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON log lines
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

/// Load settings from files and environment
///
/// Priority: env vars > config/{env} > config/default > defaults
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}
