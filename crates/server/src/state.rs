//! Shared application state

use std::sync::Arc;

use docbot_agent::ChatbotAgent;
use docbot_config::Settings;

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<ChatbotAgent>,
    pub config: Arc<Settings>,
}

impl AppState {
    pub fn new(config: Settings, agent: impl Into<Arc<ChatbotAgent>>) -> Self {
        Self {
            agent: agent.into(),
            config: Arc::new(config),
        }
    }
}
