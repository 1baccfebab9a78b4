//! Chatbot policy configuration
//!
//! Every threshold here is a tuning knob rather than a derived constant.

use serde::{Deserialize, Serialize};

use crate::constants::{conversation, gate, retrieval};

/// Retrieval gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Hybrid search blend (0 = keyword only, 1 = vector only)
    #[serde(default = "default_hybrid_alpha")]
    pub hybrid_alpha: f32,

    /// Fragments requested per search
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    /// Maximum distance accepted by the vector fallback
    #[serde(default = "default_distance_threshold")]
    pub distance_threshold: f32,

    /// Minimum trimmed fragment length kept by the vector fallback
    #[serde(default = "default_min_fragment_chars")]
    pub min_fragment_chars: usize,

    /// Minimum trimmed context length for a "good" result
    #[serde(default = "default_good_context_min_chars")]
    pub good_context_min_chars: usize,

    /// Characters of the last assistant turn passed as search bias
    #[serde(default = "default_bias_max_chars")]
    pub bias_max_chars: usize,

    /// Qualifier appended by the first rewrite strategy
    #[serde(default = "default_domain_qualifier")]
    pub domain_qualifier: String,

    /// Tokens kept by the keyword-only rewrite strategy
    #[serde(default = "default_keyword_query_terms")]
    pub keyword_query_terms: usize,

    /// Distance cutoff of the permissive diagnostic search
    #[serde(default = "default_permissive_distance")]
    pub permissive_distance: f32,

    /// Fragment length floor (exclusive) of the permissive search
    #[serde(default = "default_permissive_min_chars")]
    pub permissive_min_chars: usize,

    /// Fragments requested by the permissive search
    #[serde(default = "default_permissive_limit")]
    pub permissive_limit: usize,
}

fn default_hybrid_alpha() -> f32 {
    retrieval::HYBRID_ALPHA
}
fn default_search_limit() -> usize {
    retrieval::SEARCH_LIMIT
}
fn default_distance_threshold() -> f32 {
    retrieval::DISTANCE_THRESHOLD
}
fn default_min_fragment_chars() -> usize {
    retrieval::MIN_FRAGMENT_CHARS
}
fn default_good_context_min_chars() -> usize {
    retrieval::GOOD_CONTEXT_MIN_CHARS
}
fn default_bias_max_chars() -> usize {
    retrieval::BIAS_MAX_CHARS
}
fn default_domain_qualifier() -> String {
    retrieval::DOMAIN_QUALIFIER.to_string()
}
fn default_keyword_query_terms() -> usize {
    retrieval::KEYWORD_QUERY_TERMS
}
fn default_permissive_distance() -> f32 {
    retrieval::PERMISSIVE_DISTANCE
}
fn default_permissive_min_chars() -> usize {
    retrieval::PERMISSIVE_MIN_CHARS
}
fn default_permissive_limit() -> usize {
    retrieval::PERMISSIVE_LIMIT
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            hybrid_alpha: default_hybrid_alpha(),
            search_limit: default_search_limit(),
            distance_threshold: default_distance_threshold(),
            min_fragment_chars: default_min_fragment_chars(),
            good_context_min_chars: default_good_context_min_chars(),
            bias_max_chars: default_bias_max_chars(),
            domain_qualifier: default_domain_qualifier(),
            keyword_query_terms: default_keyword_query_terms(),
            permissive_distance: default_permissive_distance(),
            permissive_min_chars: default_permissive_min_chars(),
            permissive_limit: default_permissive_limit(),
        }
    }
}

/// Answer gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Base cosine similarity required between query and context
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Relief when semantic normalization changed the query
    #[serde(default = "default_normalization_relief")]
    pub normalization_relief: f32,

    /// Extra relief for anchored follow-ups
    #[serde(default = "default_anchor_relief")]
    pub anchor_relief: f32,

    /// Cap on the total relief
    #[serde(default = "default_max_relief")]
    pub max_relief: f32,

    /// Characters of context embedded for the comparison
    #[serde(default = "default_context_chars")]
    pub context_chars: usize,
}

fn default_similarity_threshold() -> f32 {
    gate::SIMILARITY_THRESHOLD
}
fn default_normalization_relief() -> f32 {
    gate::NORMALIZATION_RELIEF
}
fn default_anchor_relief() -> f32 {
    gate::ANCHOR_RELIEF
}
fn default_max_relief() -> f32 {
    gate::MAX_RELIEF
}
fn default_context_chars() -> usize {
    gate::CONTEXT_CHARS
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            normalization_relief: default_normalization_relief(),
            anchor_relief: default_anchor_relief(),
            max_relief: default_max_relief(),
            context_chars: default_context_chars(),
        }
    }
}

/// Human escalation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationConfig {
    /// Escalate after repeated retrieval failures
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Consecutive failures before escalating
    #[serde(default = "default_escalation_threshold")]
    pub threshold: u32,
}

fn default_true() -> bool {
    true
}
fn default_escalation_threshold() -> u32 {
    conversation::ESCALATION_THRESHOLD
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: default_escalation_threshold(),
        }
    }
}

/// Conversation memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Exchanges (user + assistant pairs) kept per session
    #[serde(default = "default_max_history_messages")]
    pub max_history_messages: usize,

    /// Keywords extracted for follow-up anchors
    #[serde(default = "default_anchor_keywords")]
    pub anchor_keywords: usize,

    /// Idle time before a session is evicted, in seconds (0 disables)
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

fn default_max_history_messages() -> usize {
    conversation::MAX_HISTORY_MESSAGES
}
fn default_anchor_keywords() -> usize {
    conversation::ANCHOR_KEYWORDS
}
fn default_session_idle_secs() -> u64 {
    conversation::SESSION_IDLE_SECS
}

impl MemoryConfig {
    /// Stored turn cap (both roles)
    pub fn max_turns(&self) -> usize {
        self.max_history_messages * 2
    }

    /// Idle time after which a session is evicted, if eviction is enabled
    pub fn session_idle(&self) -> Option<std::time::Duration> {
        (self.session_idle_secs > 0).then(|| std::time::Duration::from_secs(self.session_idle_secs))
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_history_messages: default_max_history_messages(),
            anchor_keywords: default_anchor_keywords(),
            session_idle_secs: default_session_idle_secs(),
        }
    }
}

/// Unanswered-question log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnansweredLogConfig {
    /// Append-only file, one question per line; empty disables
    #[serde(default = "default_unanswered_path")]
    pub path: String,
}

fn default_unanswered_path() -> String {
    conversation::UNANSWERED_LOG_PATH.to_string()
}

impl Default for UnansweredLogConfig {
    fn default() -> Self {
        Self {
            path: default_unanswered_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let gate = GateConfig::default();
        assert!((gate.similarity_threshold - 0.80).abs() < f32::EPSILON);
        assert!((gate.max_relief - 0.03).abs() < f32::EPSILON);

        let retrieval = RetrievalConfig::default();
        assert_eq!(retrieval.good_context_min_chars, 50);
        assert!((retrieval.distance_threshold - 0.45).abs() < f32::EPSILON);

        assert_eq!(EscalationConfig::default().threshold, 3);
        assert_eq!(MemoryConfig::default().max_turns(), 16);
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let gate: GateConfig = serde_json::from_str(r#"{"similarity_threshold": 0.7}"#).unwrap();
        assert!((gate.similarity_threshold - 0.7).abs() < f32::EPSILON);
        assert!((gate.anchor_relief - 0.01).abs() < f32::EPSILON);
    }

    #[test]
    fn test_session_idle() {
        let memory = MemoryConfig::default();
        assert_eq!(memory.session_idle(), Some(std::time::Duration::from_secs(3600)));

        let memory: MemoryConfig = serde_json::from_str(r#"{"session_idle_secs": 0}"#).unwrap();
        assert_eq!(memory.session_idle(), None);
        assert_eq!(memory.max_history_messages, 8);
    }
}
