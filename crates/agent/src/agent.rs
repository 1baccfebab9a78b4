//! Chatbot orchestrator
//!
//! Sequences one turn:
//!
//! ```text
//! START → PREDEFINED_CHECK → FOLLOWUP_REWRITE → ESCALATION_PRECHECK → RETRIEVE
//!       → ESCALATION_POSTCHECK → ANSWER_GATE → GENERATE → VALIDATE → COMMIT
//! ```
//!
//! Every path ends in COMMIT (answer, canned reply, no-info or escalation) or
//! in an error payload. The session lock is held for the whole turn.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use docbot_config::{MemoryConfig, Settings};
use docbot_core::{Embedder, LanguageModel, RetrievalResult, SearchMethod, VectorStore};
use docbot_llm::{GenerationOutcome, GenerationRequest, ResponseGenerator};
use docbot_rag::{normalize_generic, AnswerGate, QueryNormalizer, RetrievalGateway};

use crate::escalation::{EscalationPolicy, EscalationReason};
use crate::memory::{InMemorySessionStore, Session, SessionStore};
use crate::resolver::QueryResolver;
use crate::responses::{predefined_response, NO_INFO_RESPONSE};
use crate::unanswered::UnansweredLog;
use crate::AgentError;

/// Normalized-query note passed to the model is cut to this length
const NOTE_MAX_CHARS: usize = 220;

/// Characters of retrieved context echoed by diagnostics
const PREVIEW_CHARS: usize = 300;

/// States of the turn state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Start,
    PredefinedCheck,
    FollowupRewrite,
    EscalationPrecheck,
    Retrieve,
    EscalationPostcheck,
    AnswerGate,
    Generate,
    Validate,
    Commit,
}

impl TurnState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnState::Start => "start",
            TurnState::PredefinedCheck => "predefined_check",
            TurnState::FollowupRewrite => "followup_rewrite",
            TurnState::EscalationPrecheck => "escalation_precheck",
            TurnState::Retrieve => "retrieve",
            TurnState::EscalationPostcheck => "escalation_postcheck",
            TurnState::AnswerGate => "answer_gate",
            TurnState::Generate => "generate",
            TurnState::Validate => "validate",
            TurnState::Commit => "commit",
        }
    }
}

/// How a turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Predefined,
    Answered,
    NoInfo,
    Escalated,
    Failed,
}

/// Reply to one question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub escalate_to_human: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_reason: Option<EscalationReason>,
    #[serde(skip)]
    pub outcome: TurnOutcome,
}

impl ChatResponse {
    fn reply(text: impl Into<String>, outcome: TurnOutcome) -> Self {
        Self {
            response: Some(text.into()),
            error: None,
            escalate_to_human: false,
            escalation_reason: None,
            outcome,
        }
    }

    pub fn answer(text: impl Into<String>) -> Self {
        Self::reply(text, TurnOutcome::Answered)
    }

    pub fn escalation(reason: EscalationReason) -> Self {
        Self {
            response: Some(reason.message().to_string()),
            error: None,
            escalate_to_human: true,
            escalation_reason: Some(reason),
            outcome: TurnOutcome::Escalated,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            response: None,
            error: Some(message.into()),
            escalate_to_human: false,
            escalation_reason: None,
            outcome: TurnOutcome::Failed,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Reply text, or the error message
    pub fn text(&self) -> &str {
        self.response
            .as_deref()
            .or(self.error.as_deref())
            .unwrap_or("")
    }
}

/// Collaborator connectivity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Connected,
    Disconnected,
}

impl From<bool> for ServiceStatus {
    fn from(up: bool) -> Self {
        if up {
            ServiceStatus::Connected
        } else {
            ServiceStatus::Disconnected
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealth {
    pub vector_store: ServiceStatus,
    pub embeddings: ServiceStatus,
    pub llm: ServiceStatus,
}

/// Aggregated collaborator health
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub services: ServiceHealth,
}

impl HealthReport {
    pub fn is_ok(&self) -> bool {
        self.status == HealthStatus::Ok
    }
}

/// Summary of one diagnostic search
#[derive(Debug, Clone, Serialize)]
pub struct SearchSummary {
    pub success: bool,
    pub results_count: usize,
    pub search_method: SearchMethod,
    pub context_chars: usize,
    pub good_context: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    pub context_preview: String,
}

impl SearchSummary {
    fn from_result(result: &RetrievalResult, good_context: bool) -> Self {
        let context = result.context_text().trim();
        Self {
            success: result.success,
            results_count: result.results_count,
            search_method: result.search_method,
            context_chars: context.chars().count(),
            good_context,
            score: result.score,
            context_preview: context.chars().take(PREVIEW_CHARS).collect(),
        }
    }
}

/// Standard and permissive search side by side
#[derive(Debug, Clone, Serialize)]
pub struct SearchDiagnostics {
    pub question: String,
    pub normalized_query: String,
    pub standard: SearchSummary,
    pub permissive: SearchSummary,
}

/// Documentation chatbot
pub struct ChatbotAgent {
    sessions: Arc<dyn SessionStore>,
    resolver: QueryResolver,
    gateway: RetrievalGateway,
    gate: AnswerGate,
    generator: ResponseGenerator,
    escalation: EscalationPolicy,
    unanswered: UnansweredLog,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn LanguageModel>,
    memory: MemoryConfig,
}

impl ChatbotAgent {
    /// Wire the chatbot from settings and its three collaborators
    pub fn new(
        settings: &Settings,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn LanguageModel>,
    ) -> Self {
        let normalizer = Arc::new(QueryNormalizer::default());

        Self {
            sessions: Arc::new(InMemorySessionStore::from_config(&settings.memory)),
            resolver: QueryResolver::new(settings.memory.anchor_keywords),
            gateway: RetrievalGateway::new(
                store.clone(),
                embedder.clone(),
                normalizer.clone(),
                settings.retrieval.clone(),
            ),
            gate: AnswerGate::new(embedder.clone(), normalizer, settings.gate.clone()),
            generator: ResponseGenerator::new(llm.clone()),
            escalation: EscalationPolicy::new(settings.escalation.clone()),
            unanswered: UnansweredLog::new(&settings.unanswered_log.path),
            store,
            embedder,
            llm,
            memory: settings.memory.clone(),
        }
    }

    /// Replace the session backend
    pub fn with_session_store(mut self, sessions: Arc<dyn SessionStore>) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn with_unanswered_log(mut self, log: UnansweredLog) -> Self {
        self.unanswered = log;
        self
    }

    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.generator = self.generator.with_product(product);
        self
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.count()
    }

    /// Process one question for a session
    ///
    /// Never fails: errors become an `{error}` payload.
    pub async fn process_question(&self, question: &str, session_id: &str) -> ChatResponse {
        let question = question.trim();
        if question.is_empty() {
            return ChatResponse::error("No se proporcionó pregunta");
        }

        let handle = self.sessions.get_or_create(session_id).await;
        let mut session = handle.lock().await;

        tracing::info!(session_id = %session_id, question = %question, "Question received");

        match self.run_turn(question, &mut session).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "Turn failed");
                ChatResponse::error(e.user_message())
            }
        }
    }

    async fn run_turn(&self, question: &str, session: &mut Session) -> Result<ChatResponse, AgentError> {
        self.enter(session, TurnState::Start);

        self.enter(session, TurnState::PredefinedCheck);
        if let Some(reply) = predefined_response(question) {
            self.enter(session, TurnState::Commit);
            session.append_exchange(question, reply);
            return Ok(ChatResponse::reply(reply, TurnOutcome::Predefined));
        }

        self.enter(session, TurnState::FollowupRewrite);
        let resolution = self.resolver.resolve(question, session);
        tracing::debug!(
            kind = ?resolution.kind,
            original = %resolution.original,
            anchored = %resolution.anchored,
            "Query resolved"
        );

        self.enter(session, TurnState::EscalationPrecheck);
        let decision = self.escalation.precheck(question);
        if decision.should_escalate {
            return Ok(self.escalate(question, session, decision.reason));
        }

        self.enter(session, TurnState::Retrieve);
        let bias = session.last_assistant().map(str::to_string);
        let semantic = self.gateway.semantic_query(&resolution.anchored);
        let result = self
            .gateway
            .retrieve(&resolution.original, &semantic, bias.as_deref())
            .await;

        if !self.gateway.is_good_context(&result) {
            tracing::info!(
                session_id = %session.id,
                method = %result.search_method,
                results = result.results_count,
                "No usable context"
            );
            return Ok(self.after_failure(question, session, result.has_context()).await);
        }

        tracing::info!(
            method = %result.search_method,
            results = result.results_count,
            "Context found"
        );

        self.enter(session, TurnState::AnswerGate);
        let verdict = self
            .gate
            .evaluate(&resolution.anchored, result.context_text(), result.results_count)
            .await;
        if !verdict.passed {
            tracing::info!(
                similarity = ?verdict.similarity,
                threshold = verdict.threshold,
                "Context rejected by answer gate"
            );
            return Ok(self.after_failure(question, session, true).await);
        }

        self.enter(session, TurnState::Generate);
        let history = session.history_messages(self.memory.max_history_messages);
        let note = normalize_generic(&truncate_chars(&semantic.raw_query, NOTE_MAX_CHARS));
        let request = GenerationRequest {
            question,
            normalized_query: &note,
            context: result.context_text(),
            results_count: result.results_count,
            search_method: result.search_method,
            history: &history,
        };
        let outcome = self.generator.generate(&request).await;

        self.enter(session, TurnState::Validate);
        match outcome {
            GenerationOutcome::Answer(answer) => {
                self.enter(session, TurnState::Commit);
                session.append_exchange(question, &answer);
                session.reset_failures();
                Ok(ChatResponse::answer(answer))
            }
            GenerationOutcome::NoInfo => {
                tracing::info!(session_id = %session.id, "Model refused twice, answering no-info");
                Ok(self.no_info(question, session).await)
            }
            GenerationOutcome::Failed(message) => Err(AgentError::Generation(message)),
        }
    }

    fn enter(&self, session: &Session, state: TurnState) {
        tracing::debug!(session_id = %session.id, state = state.as_str(), "Turn state");
    }

    /// Count the failure, then escalate or decline
    async fn after_failure(&self, question: &str, session: &mut Session, has_context: bool) -> ChatResponse {
        self.enter(session, TurnState::EscalationPostcheck);
        let decision = self.escalation.postcheck(session, has_context);
        if decision.should_escalate {
            self.escalate(question, session, decision.reason)
        } else {
            self.no_info(question, session).await
        }
    }

    fn escalate(&self, question: &str, session: &mut Session, reason: EscalationReason) -> ChatResponse {
        tracing::info!(session_id = %session.id, reason = %reason, "Escalating to a human");
        self.enter(session, TurnState::Commit);
        let response = ChatResponse::escalation(reason);
        session.append_exchange(question, reason.message());
        response
    }

    async fn no_info(&self, question: &str, session: &mut Session) -> ChatResponse {
        self.enter(session, TurnState::Commit);
        session.append_exchange(question, NO_INFO_RESPONSE);
        self.unanswered.record(question).await;
        ChatResponse::reply(NO_INFO_RESPONSE, TurnOutcome::NoInfo)
    }

    /// Drop a session's history and failure counter
    ///
    /// Waits for a turn in flight on the same session, then clears it.
    /// Clearing an unknown session also succeeds.
    pub async fn clear_history(&self, session_id: &str) -> bool {
        let existed = self.sessions.clear(session_id).await;
        tracing::info!(session_id = %session_id, existed, "History cleared");
        true
    }

    /// Evict sessions idle past the configured limit
    pub fn evict_idle_sessions(&self) -> usize {
        match self.memory.session_idle() {
            Some(max_idle) => self.sessions.evict_idle(max_idle),
            None => 0,
        }
    }

    /// Check all collaborators concurrently
    pub async fn health(&self) -> HealthReport {
        let (vector_store, embeddings, llm) = tokio::join!(
            self.store.is_ready(),
            self.embedder.is_available(),
            self.llm.is_available(),
        );

        let status = if vector_store && embeddings && llm {
            HealthStatus::Ok
        } else {
            HealthStatus::Degraded
        };

        HealthReport {
            status,
            timestamp: Utc::now(),
            services: ServiceHealth {
                vector_store: vector_store.into(),
                embeddings: embeddings.into(),
                llm: llm.into(),
            },
        }
    }

    /// Standard and permissive retrieval for a question, without session state
    pub async fn diagnose(&self, question: &str) -> SearchDiagnostics {
        let question = question.trim();
        let diagnostic = self.gateway.diagnose(question).await;
        let permissive_good = self.gateway.is_good_context(&diagnostic.permissive);

        SearchDiagnostics {
            question: question.to_string(),
            normalized_query: self.gateway.normalizer().normalize_for_semantics(question),
            standard: SearchSummary::from_result(
                &diagnostic.standard,
                self.gateway.is_good_context(&diagnostic.standard),
            ),
            permissive: SearchSummary::from_result(&diagnostic.permissive, permissive_good),
        }
    }

    pub fn memory_config(&self) -> &MemoryConfig {
        &self.memory
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_response_serialization() {
        let ok = serde_json::to_value(ChatResponse::answer("Paso 1")).unwrap();
        assert_eq!(ok, serde_json::json!({"response": "Paso 1"}));

        let esc = serde_json::to_value(ChatResponse::escalation(EscalationReason::NoContext)).unwrap();
        assert_eq!(esc["escalate_to_human"], true);
        assert_eq!(esc["escalation_reason"], "no_context");

        let err = serde_json::to_value(ChatResponse::error("Error al generar respuesta")).unwrap();
        assert_eq!(err, serde_json::json!({"error": "Error al generar respuesta"}));
    }

    #[test]
    fn test_service_status_serde() {
        let json = serde_json::to_string(&ServiceStatus::from(false)).unwrap();
        assert_eq!(json, "\"disconnected\"");
        assert_eq!(serde_json::to_string(&HealthStatus::Degraded).unwrap(), "\"degraded\"");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("ñandú", 3), "ñan");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
