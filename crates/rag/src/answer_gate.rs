//! Answer gate
//!
//! Grounding check run before generation: the query and the retrieved context
//! must be semantically close, otherwise the turn declines.

use std::sync::Arc;

use docbot_config::GateConfig;
use docbot_core::{Embedder, ResolvedQuery};

use crate::embeddings::cosine_similarity;
use crate::normalizer::QueryNormalizer;

/// Outcome of a gate evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateVerdict {
    /// Cosine similarity, `None` when an embedding failed or nothing was retrieved
    pub similarity: Option<f32>,
    pub threshold: f32,
    pub passed: bool,
}

/// Threshold after relief
///
/// `normalized` relief applies when semantic normalization changed the query,
/// `anchored` relief for follow-ups. Total relief is capped at `max_relief`;
/// the result stays within `[0, base]`.
pub fn effective_threshold(base: f32, normalized: bool, anchored: bool, config: &GateConfig) -> f32 {
    let mut relief = 0.0;
    if normalized {
        relief += config.normalization_relief;
    }
    if anchored {
        relief += config.anchor_relief;
    }
    let relief = relief.clamp(0.0, config.max_relief.max(0.0));
    let base = base.max(0.0);
    (base - relief).clamp(0.0, base)
}

pub struct AnswerGate {
    embedder: Arc<dyn Embedder>,
    normalizer: Arc<QueryNormalizer>,
    config: GateConfig,
}

impl AnswerGate {
    pub fn new(embedder: Arc<dyn Embedder>, normalizer: Arc<QueryNormalizer>, config: GateConfig) -> Self {
        Self {
            embedder,
            normalizer,
            config,
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Threshold for a given resolved query
    pub fn threshold_for(&self, query: &ResolvedQuery) -> f32 {
        effective_threshold(
            self.config.similarity_threshold,
            self.normalizer.changes(&query.raw_query),
            query.is_anchored(),
            &self.config,
        )
    }

    /// Embed query and context and compare against the effective threshold
    ///
    /// `query` is the resolved query before semantic normalization: the
    /// threshold depends on whether normalization changes it, and the
    /// embedded text is its normalized, anchored form.
    pub async fn evaluate(&self, query: &ResolvedQuery, context: &str, results_count: usize) -> GateVerdict {
        let threshold = self.threshold_for(query);
        let rejected = GateVerdict {
            similarity: None,
            threshold,
            passed: false,
        };

        let context = head_chars(context.trim(), self.config.context_chars);
        if results_count == 0 || context.is_empty() {
            return rejected;
        }

        let semantic = ResolvedQuery::anchored(
            self.normalizer.normalize_for_semantics(&query.raw_query),
            query.anchor_keywords.clone(),
        );
        let query_vec = match self.embedder.embed(&semantic.to_query_string()).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "Gate: query embedding failed");
                return rejected;
            }
        };
        let context_vec = match self.embedder.embed(context).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "Gate: context embedding failed");
                return rejected;
            }
        };

        let similarity = cosine_similarity(&query_vec, &context_vec);
        let passed = similarity >= threshold;
        tracing::debug!(similarity, threshold, passed, "Answer gate");

        GateVerdict {
            similarity: Some(similarity),
            threshold,
            passed,
        }
    }

    pub async fn should_respond(&self, query: &ResolvedQuery, context: &str, results_count: usize) -> bool {
        self.evaluate(query, context, results_count).await.passed
    }
}

fn head_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    #[test]
    fn test_effective_threshold_monotonic() {
        let cfg = GateConfig::default();
        for base in [0.0f32, 0.01, 0.5, 0.8, 1.0] {
            let plain = effective_threshold(base, false, false, &cfg);
            let norm = effective_threshold(base, true, false, &cfg);
            let anch = effective_threshold(base, false, true, &cfg);
            let both = effective_threshold(base, true, true, &cfg);
            assert_eq!(plain, base);
            assert!(norm <= plain && anch <= plain);
            assert!(both <= norm && both <= anch);
            for t in [plain, norm, anch, both] {
                assert!((0.0..=base).contains(&t));
            }
        }
    }

    #[test]
    fn test_relief_values() {
        let cfg = GateConfig::default();
        assert!((effective_threshold(0.8, true, false, &cfg) - 0.78).abs() < 1e-6);
        assert!((effective_threshold(0.8, true, true, &cfg) - 0.77).abs() < 1e-6);
    }

    #[test]
    fn test_relief_cap() {
        let cfg = GateConfig {
            normalization_relief: 0.5,
            anchor_relief: 0.5,
            max_relief: 0.03,
            ..Default::default()
        };
        assert!((effective_threshold(0.8, true, true, &cfg) - 0.77).abs() < 1e-6);
    }

    /// Maps text to a vector by whether it mentions "cuenta"
    struct TopicEmbedder {
        fail: bool,
    }

    #[async_trait]
    impl Embedder for TopicEmbedder {
        async fn embed(&self, text: &str) -> docbot_core::Result<Vec<f32>> {
            if self.fail {
                return Err(docbot_core::Error::Embedding("down".into()));
            }
            Ok(if text.contains("cuenta") {
                vec![1.0, 0.0]
            } else {
                vec![0.0, 1.0]
            })
        }
        async fn is_available(&self) -> bool {
            !self.fail
        }
        fn model_name(&self) -> &str {
            "topic"
        }
    }

    fn gate(fail: bool) -> AnswerGate {
        AnswerGate::new(
            Arc::new(TopicEmbedder { fail }),
            Arc::new(QueryNormalizer::default()),
            GateConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_gate_passes_related_context() {
        let q = ResolvedQuery::new("crear cuenta");
        assert!(gate(false).should_respond(&q, "alta de cuenta contable", 1).await);
    }

    #[tokio::test]
    async fn test_gate_rejects_unrelated_context() {
        let q = ResolvedQuery::new("crear cuenta");
        let verdict = gate(false).evaluate(&q, "cierre de ejercicio", 1).await;
        assert!(!verdict.passed);
        assert_eq!(verdict.similarity, Some(0.0));
    }

    #[tokio::test]
    async fn test_gate_rejects_on_embedding_failure_or_empty() {
        let q = ResolvedQuery::new("crear cuenta");
        assert!(!gate(true).should_respond(&q, "alta de cuenta", 1).await);
        assert!(!gate(false).should_respond(&q, "alta de cuenta", 0).await);
        assert!(!gate(false).should_respond(&q, "   ", 1).await);
    }
}
