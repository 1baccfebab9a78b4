//! Conversational core of the documentation chatbot
//!
//! Features:
//! - Per-session conversation memory with a failure counter
//! - Query resolution for acknowledgements, follow-ups and ordinal references
//! - Human escalation policy
//! - Turn orchestration from retrieval through grounded generation

pub mod agent;
pub mod escalation;
pub mod memory;
pub mod resolver;
pub mod responses;
pub mod unanswered;

pub use agent::{
    ChatResponse, ChatbotAgent, HealthReport, HealthStatus, SearchDiagnostics, SearchSummary,
    ServiceHealth, ServiceStatus, TurnOutcome, TurnState,
};
pub use escalation::{EscalationDecision, EscalationPolicy, EscalationReason};
pub use memory::{InMemorySessionStore, Session, SessionHandle, SessionStore};
pub use resolver::{QueryResolver, Resolution, ResolutionKind, CONTINUE_INTENT};
pub use responses::{predefined_response, NO_INFO_RESPONSE};
pub use unanswered::UnansweredLog;

use thiserror::Error;

/// Agent errors
///
/// Collaborator failures never surface here: retrieval degrades to an empty
/// result and generation reports its own outcome. Only a generation that
/// cannot produce any text ends the turn with an error.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Generation error: {0}")]
    Generation(String),
}

impl AgentError {
    /// Message safe to show to the end user
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Generation(msg) => msg.clone(),
        }
    }
}

impl From<AgentError> for docbot_core::Error {
    fn from(err: AgentError) -> Self {
        docbot_core::Error::Agent(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message() {
        assert_eq!(
            AgentError::Generation("Error al generar respuesta".into()).user_message(),
            "Error al generar respuesta"
        );
    }

    #[test]
    fn test_into_core_error() {
        let core: docbot_core::Error = AgentError::Generation("sin texto".into()).into();
        assert!(matches!(core, docbot_core::Error::Agent(_)));
    }
}
