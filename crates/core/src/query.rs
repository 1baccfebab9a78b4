//! Resolved retrieval query
//!
//! A follow-up such as "y el segundo?" is meaningless to a vector store on its
//! own, so the resolver attaches keywords from the last informative turn. The
//! anchor travels as structured data and is only flattened into a single
//! string when an embedding or keyword search needs one.

use serde::{Deserialize, Serialize};

/// Separator placed between the query and its anchor keywords when flattened
pub const ANCHOR_DELIMITER: &str = " || contexto_previo: ";

/// Query text plus optional prior-context anchor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedQuery {
    /// Query text as it should be searched (user text or rewritten intent)
    pub raw_query: String,
    /// Keywords from the prior informative turn, in priority order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anchor_keywords: Vec<String>,
}

impl ResolvedQuery {
    /// Unanchored query
    pub fn new(raw_query: impl Into<String>) -> Self {
        Self {
            raw_query: raw_query.into(),
            anchor_keywords: Vec::new(),
        }
    }

    /// Query anchored to prior context
    pub fn anchored(raw_query: impl Into<String>, anchor_keywords: Vec<String>) -> Self {
        Self {
            raw_query: raw_query.into(),
            anchor_keywords: anchor_keywords
                .into_iter()
                .filter(|k| !k.trim().is_empty())
                .collect(),
        }
    }

    pub fn is_anchored(&self) -> bool {
        !self.anchor_keywords.is_empty()
    }

    /// Anchor keywords joined with single spaces
    pub fn anchor_text(&self) -> String {
        self.anchor_keywords.join(" ")
    }

    /// Flatten into the delimited single-string form
    pub fn to_query_string(&self) -> String {
        if self.is_anchored() {
            format!("{}{}{}", self.raw_query.trim(), ANCHOR_DELIMITER, self.anchor_text())
        } else {
            self.raw_query.trim().to_string()
        }
    }

}

impl std::fmt::Display for ResolvedQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_query_string())
    }
}
