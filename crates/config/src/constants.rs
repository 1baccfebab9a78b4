//! Centralized default values
//!
//! Single source of truth for the thresholds and endpoints used across the
//! workspace. Config structs take their serde defaults from here.

/// Collaborator endpoints
pub mod endpoints {
    /// OpenAI-compatible API base URL (chat and embeddings)
    pub const OPENAI_DEFAULT: &str = "https://api.openai.com/v1";

    /// Weaviate REST endpoint
    pub const WEAVIATE_DEFAULT: &str = "http://localhost:8080";
}

/// Model identifiers
pub mod models {
    pub const CHAT_DEFAULT: &str = "gpt-4o-mini";
    pub const EMBEDDING_DEFAULT: &str = "text-embedding-ada-002";
}

/// Vector store schema
pub mod collection {
    /// Class holding the documentation fragments
    pub const NAME: &str = "Documento";
    /// Text property of each fragment
    pub const CONTENT_PROPERTY: &str = "contenido";
}

/// Retrieval gateway defaults
pub mod retrieval {
    /// Vector/keyword blend for hybrid search
    pub const HYBRID_ALPHA: f32 = 0.5;
    /// Fragments requested per search
    pub const SEARCH_LIMIT: usize = 5;
    /// Maximum cosine distance for a vector-fallback hit
    pub const DISTANCE_THRESHOLD: f32 = 0.45;
    /// Minimum trimmed fragment length kept by vector search
    pub const MIN_FRAGMENT_CHARS: usize = 1;
    /// Minimum trimmed context length for "good context"
    pub const GOOD_CONTEXT_MIN_CHARS: usize = 50;
    /// Trailing characters of the last assistant turn used as search bias
    pub const BIAS_MAX_CHARS: usize = 600;
    /// Qualifier appended by the first rewrite strategy
    pub const DOMAIN_QUALIFIER: &str = "en el sistema";
    /// Tokens kept by the keyword-only rewrite strategy
    pub const KEYWORD_QUERY_TERMS: usize = 4;
    /// Permissive (diagnostic) search cutoffs
    pub const PERMISSIVE_DISTANCE: f32 = 0.7;
    pub const PERMISSIVE_MIN_CHARS: usize = 20;
    pub const PERMISSIVE_LIMIT: usize = 15;
}

/// Answer gate defaults
pub mod gate {
    pub const SIMILARITY_THRESHOLD: f32 = 0.80;
    pub const NORMALIZATION_RELIEF: f32 = 0.02;
    pub const ANCHOR_RELIEF: f32 = 0.01;
    pub const MAX_RELIEF: f32 = 0.03;
    /// Characters of context embedded for the similarity check
    pub const CONTEXT_CHARS: usize = 1000;
}

/// Escalation and memory defaults
pub mod conversation {
    pub const ESCALATION_THRESHOLD: u32 = 3;
    /// Stored history is capped at twice this (user + assistant)
    pub const MAX_HISTORY_MESSAGES: usize = 8;
    pub const ANCHOR_KEYWORDS: usize = 8;
    pub const UNANSWERED_LOG_PATH: &str = "preguntas_no_respondidas.log";
    /// Sessions untouched for this long are evicted; 0 keeps them forever
    pub const SESSION_IDLE_SECS: u64 = 3600;
}

/// Generation defaults
pub mod generation {
    pub const MAX_OUTPUT_TOKENS: u32 = 1800;
    pub const TEMPERATURE: f32 = 0.2;
    pub const EMBEDDING_MAX_INPUT_TOKENS: usize = 8000;
}
