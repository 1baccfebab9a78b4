//! Retrieval result shapes shared by the gateway, the answer gate and the
//! response generator

use serde::{Deserialize, Serialize};

/// How a retrieval result was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    /// Vector similarity blended with keyword scoring
    Hybrid,
    /// Pure nearest-neighbour search with a distance cutoff
    VectorFallback,
    /// Search over a rewritten query (domain qualifier or keyword-only)
    KeywordAugmented,
    /// No search produced anything
    #[default]
    None,
}

impl SearchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMethod::Hybrid => "hybrid",
            SearchMethod::VectorFallback => "vector_fallback",
            SearchMethod::KeywordAugmented => "keyword_augmented",
            SearchMethod::None => "none",
        }
    }
}

impl std::fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document fragment returned by the vector store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Fragment text
    pub content: String,
    /// Vector distance (nearest-neighbour searches)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
    /// Blended relevance score (hybrid searches)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl DocumentChunk {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            distance: None,
            score: None,
        }
    }

    pub fn with_distance(mut self, distance: f32) -> Self {
        self.distance = Some(distance);
        self
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }
}

/// Parameters of a hybrid (vector + keyword) search
#[derive(Debug, Clone, PartialEq)]
pub struct HybridQuery {
    /// Keyword query text
    pub text: String,
    /// Extra context blended into the keyword side, if any
    pub bias: Option<String>,
    /// Query embedding for the vector side, if already computed
    pub vector: Option<Vec<f32>>,
    /// Maximum number of fragments
    pub limit: usize,
    /// Blend factor: 0.0 is pure keyword, 1.0 is pure vector
    pub alpha: f32,
}

impl HybridQuery {
    pub fn new(text: impl Into<String>, limit: usize, alpha: f32) -> Self {
        Self {
            text: text.into(),
            bias: None,
            vector: None,
            limit,
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    pub fn with_bias(mut self, bias: impl Into<String>) -> Self {
        let bias = bias.into();
        self.bias = if bias.trim().is_empty() { None } else { Some(bias) };
        self
    }

    pub fn with_vector(mut self, vector: Vec<f32>) -> Self {
        self.vector = Some(vector);
        self
    }

    /// Keyword text with the bias appended
    pub fn keyword_text(&self) -> String {
        match &self.bias {
            Some(bias) => format!("{} {}", self.text, bias),
            None => self.text.clone(),
        }
    }
}

/// Outcome of one retrieval attempt
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub success: bool,
    /// Newline-joined fragments, in retrieval order
    pub context: Option<String>,
    pub results_count: usize,
    pub search_method: SearchMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl RetrievalResult {
    /// Result of a failed or empty search
    pub fn none() -> Self {
        Self::default()
    }

    /// Build a result from the fragments that passed filtering
    pub fn from_fragments(fragments: Vec<String>, method: SearchMethod, score: Option<f32>) -> Self {
        if fragments.is_empty() {
            return Self {
                search_method: method,
                ..Self::default()
            };
        }
        Self {
            success: true,
            results_count: fragments.len(),
            context: Some(fragments.join("\n")),
            search_method: method,
            score,
        }
    }

    pub fn with_method(mut self, method: SearchMethod) -> Self {
        self.search_method = method;
        self
    }

    /// Context text, empty when absent
    pub fn context_text(&self) -> &str {
        self.context.as_deref().unwrap_or("")
    }

    /// Whether the search produced any context at all
    pub fn has_context(&self) -> bool {
        self.success && !self.context_text().trim().is_empty()
    }

    /// Ordering key: score, then result count, then context length
    pub fn rank_key(&self) -> (f32, usize, usize) {
        (
            self.score.unwrap_or(0.0),
            self.results_count,
            self.context_text().trim().chars().count(),
        )
    }
}
