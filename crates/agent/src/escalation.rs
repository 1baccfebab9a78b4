//! Human escalation policy
//!
//! Two keyword checks run before retrieval. A per-session failure counter
//! covers repeated retrieval or gate failures after it.

use serde::{Deserialize, Serialize};

use docbot_config::EscalationConfig;
use docbot_rag::normalize_generic;

use crate::memory::Session;

/// Why a turn was handed to a human
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationReason {
    UserExplicitRequest,
    SensitiveTopic,
    NoContext,
    LowSimilarity,
    None,
}

impl EscalationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationReason::UserExplicitRequest => "user_explicit_request",
            EscalationReason::SensitiveTopic => "sensitive_topic",
            EscalationReason::NoContext => "no_context",
            EscalationReason::LowSimilarity => "low_similarity",
            EscalationReason::None => "none",
        }
    }

    /// Canned reply shown to the user
    pub fn message(&self) -> &'static str {
        match self {
            EscalationReason::UserExplicitRequest => {
                "Por supuesto, te conectaré con un consultor que podrá ayudarte de manera más personalizada."
            }
            EscalationReason::SensitiveTopic => {
                "Para este tipo de consultas es mejor que hables directamente con uno de nuestros especialistas."
            }
            EscalationReason::NoContext => {
                "No encontré información específica sobre tu consulta en la documentación disponible. \
                 Te voy a conectar con un especialista que podrá ayudarte mejor."
            }
            EscalationReason::LowSimilarity => {
                "La información que encontré no parece estar relacionada con tu consulta. \
                 Te voy a conectar con un especialista que podrá ayudarte mejor."
            }
            EscalationReason::None => "Te voy a conectar con un consultor que podrá ayudarte mejor.",
        }
    }
}

impl std::fmt::Display for EscalationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-turn escalation outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationDecision {
    pub should_escalate: bool,
    pub reason: EscalationReason,
}

impl EscalationDecision {
    pub fn escalate(reason: EscalationReason) -> Self {
        Self {
            should_escalate: true,
            reason,
        }
    }

    pub fn proceed() -> Self {
        Self {
            should_escalate: false,
            reason: EscalationReason::None,
        }
    }
}

const ESCALATION_KEYWORDS: &[&str] = &[
    "humano",
    "persona",
    "agente",
    "supervisor",
    "hablar con alguien",
    "no entiendo",
    "no me sirve",
    "quiero hablar",
    "contacto",
    "reclamo",
    "queja",
    "problema urgente",
    "error crítico",
    "atención al cliente",
    "soporte técnico",
    "ayuda personal",
    "ayuda",
    "no resuelve",
    "mal servicio",
    "insatisfecho",
    "frustrado",
    "consultor",
];

const SENSITIVE_TOPICS: &[&str] = &[
    "urgente",
    "necesito ayuda urgente",
    "frustrado",
    "mesa de ayuda",
    "soporte",
    "alguien",
    "contacto",
    "ayuda",
    "persona",
    "agente",
    "queja",
    "reclamo",
    "mal servicio",
    "consultor",
];

/// Phrases that identify a canned escalation reply in history
const ESCALATION_MARKERS: &[&str] = &[
    "te voy a conectar con un especialista",
    "te voy a conectar con un consultor",
    "te conectare con un consultor",
    "conectando con un consultor",
    "derivando a un especialista",
    "hables directamente con uno de nuestros especialistas",
];

/// Escalation policy
pub struct EscalationPolicy {
    config: EscalationConfig,
    escalation_keywords: Vec<String>,
    sensitive_topics: Vec<String>,
}

impl EscalationPolicy {
    pub fn new(config: EscalationConfig) -> Self {
        Self {
            config,
            escalation_keywords: ESCALATION_KEYWORDS.iter().map(|k| normalize_generic(k)).collect(),
            sensitive_topics: SENSITIVE_TOPICS.iter().map(|k| normalize_generic(k)).collect(),
        }
    }

    pub fn config(&self) -> &EscalationConfig {
        &self.config
    }

    /// Keyword-only checks that need no retrieval
    pub fn precheck(&self, question: &str) -> EscalationDecision {
        let normalized = normalize_generic(question);

        if let Some(keyword) = self.escalation_keywords.iter().find(|k| normalized.contains(k.as_str())) {
            tracing::info!(keyword = %keyword, "Escalation keyword in question");
            return EscalationDecision::escalate(EscalationReason::UserExplicitRequest);
        }

        if self.sensitive_topics.iter().any(|t| normalized.contains(t.as_str())) {
            tracing::info!("Sensitive topic in question");
            return EscalationDecision::escalate(EscalationReason::SensitiveTopic);
        }

        EscalationDecision::proceed()
    }

    /// Count a failed turn and escalate once the threshold is reached
    ///
    /// `has_context` tells a search that found nothing apart from context
    /// that the answer gate rejected.
    pub fn postcheck(&self, session: &mut Session, has_context: bool) -> EscalationDecision {
        let failures = session.record_failure();
        tracing::debug!(session_id = %session.id, failures, "Retrieval failure recorded");

        if !self.config.enabled || failures < self.config.threshold {
            return EscalationDecision::proceed();
        }

        let reason = if has_context {
            EscalationReason::LowSimilarity
        } else {
            EscalationReason::NoContext
        };
        tracing::info!(session_id = %session.id, failures, reason = %reason, "Escalating after repeated failures");
        EscalationDecision::escalate(reason)
    }

    /// Whether a stored assistant turn is a canned escalation reply
    pub fn is_escalation_message(text: &str) -> bool {
        let normalized = normalize_generic(text);
        ESCALATION_MARKERS.iter().any(|m| normalized.contains(m))
    }
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self::new(EscalationConfig::default())
    }
}
