//! Retrieval gateway
//!
//! Wraps the vector store behind a single result shape. Each search attempt
//! runs hybrid first (when the store supports it) and falls back to a
//! distance-filtered nearest-neighbour search. A turn searches both the raw
//! question and the anchored, normalized query, keeps the better result and
//! only then tries rewritten queries.

use std::sync::Arc;

use docbot_config::RetrievalConfig;
use docbot_core::{
    DocumentChunk, Embedder, HybridQuery, ResolvedQuery, RetrievalResult, SearchMethod, VectorStore,
};

use crate::keywords::extract_main_keywords;
use crate::normalizer::{normalize_generic, QueryNormalizer};

/// Standard and permissive outcomes for one question
#[derive(Debug, Clone)]
pub struct DiagnosticSearch {
    pub standard: RetrievalResult,
    pub permissive: RetrievalResult,
}

/// Retrieval gateway over a vector store and an embedder
pub struct RetrievalGateway {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    normalizer: Arc<QueryNormalizer>,
    config: RetrievalConfig,
}

impl RetrievalGateway {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        normalizer: Arc<QueryNormalizer>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            normalizer,
            config,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &QueryNormalizer {
        &self.normalizer
    }

    /// Semantic form of a resolved query: the raw part is normalized, the
    /// anchor is carried over untouched
    pub fn semantic_query(&self, query: &ResolvedQuery) -> ResolvedQuery {
        ResolvedQuery::anchored(
            self.normalizer.normalize_for_semantics(&query.raw_query),
            query.anchor_keywords.clone(),
        )
    }

    /// `success`, at least one result and enough trimmed context
    pub fn is_good_context(&self, result: &RetrievalResult) -> bool {
        result.success
            && result.results_count >= 1
            && result.context_text().trim().chars().count() >= self.config.good_context_min_chars
    }

    /// One search attempt: hybrid, then vector fallback
    ///
    /// Never fails; collaborator errors come back as [`RetrievalResult::none`].
    pub async fn search(&self, query: &ResolvedQuery, bias: Option<&str>) -> RetrievalResult {
        let text = query.to_query_string();
        if text.is_empty() {
            return RetrievalResult::none();
        }

        let vector = match self.embedder.embed(&text).await {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(error = %e, "Query embedding failed");
                None
            }
        };

        if self.store.supports_hybrid() {
            let mut hybrid = HybridQuery::new(text.as_str(), self.config.search_limit, self.config.hybrid_alpha);
            // Anchored queries already carry their context
            if !query.is_anchored() {
                if let Some(bias) = bias {
                    hybrid = hybrid.with_bias(truncate_chars(bias, self.config.bias_max_chars));
                }
            }
            if let Some(v) = &vector {
                hybrid = hybrid.with_vector(v.clone());
            }

            match self.store.hybrid_search(&hybrid).await {
                Ok(chunks) => {
                    let result = hybrid_result(chunks);
                    if result.has_context() {
                        tracing::debug!(
                            results = result.results_count,
                            score = ?result.score,
                            "Hybrid search hit"
                        );
                        return result;
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Hybrid search failed, using vector fallback"),
            }
        }

        let Some(vector) = vector else {
            return RetrievalResult::none();
        };

        match self.store.near_vector(&vector, self.config.search_limit).await {
            Ok(chunks) => {
                let result = vector_result(
                    chunks,
                    self.config.distance_threshold,
                    self.config.min_fragment_chars,
                );
                tracing::debug!(
                    results = result.results_count,
                    score = ?result.score,
                    "Vector fallback search"
                );
                result
            }
            Err(e) => {
                tracing::warn!(error = %e, "Vector search failed");
                RetrievalResult::none()
            }
        }
    }

    /// Higher score wins, then more results, then longer context; an empty
    /// result loses to any non-empty one and ties go to `b`
    pub fn pick_better(a: RetrievalResult, b: RetrievalResult) -> RetrievalResult {
        match (a.success, b.success) {
            (true, false) => a,
            (false, _) => b,
            (true, true) => {
                if a.rank_key() > b.rank_key() {
                    a
                } else {
                    b
                }
            }
        }
    }

    /// Rewrite strategies, tried in order until one gives good context
    ///
    /// 1. query plus the domain qualifier (skipped when already present)
    /// 2. keyword-only query built from the main terms
    pub async fn search_with_rewrites(
        &self,
        query: &ResolvedQuery,
        bias: Option<&str>,
    ) -> Option<RetrievalResult> {
        let raw = query.raw_query.trim();
        let qualifier = self.config.domain_qualifier.trim();

        if !qualifier.is_empty() && !normalize_generic(raw).contains(&normalize_generic(qualifier)) {
            let qualified = ResolvedQuery::anchored(
                format!("{} {}", raw, qualifier),
                query.anchor_keywords.clone(),
            );
            let result = self.search(&qualified, bias).await;
            if self.is_good_context(&result) {
                tracing::debug!("Qualified rewrite produced good context");
                return Some(result.with_method(SearchMethod::KeywordAugmented));
            }
        }

        if let Some(keywords) = extract_main_keywords(raw, self.config.keyword_query_terms) {
            if keywords != normalize_generic(raw) {
                let result = self.search(&ResolvedQuery::new(keywords), bias).await;
                if self.is_good_context(&result) {
                    tracing::debug!("Keyword rewrite produced good context");
                    return Some(result.with_method(SearchMethod::KeywordAugmented));
                }
            }
        }

        None
    }

    /// Full retrieval for a turn
    ///
    /// `original` is the question as the user meant it (acknowledgements
    /// already expanded); `semantic` is the output of [`Self::semantic_query`]
    /// for the anchored query. The result may still fail
    /// [`Self::is_good_context`].
    pub async fn retrieve(
        &self,
        original: &ResolvedQuery,
        semantic: &ResolvedQuery,
        bias: Option<&str>,
    ) -> RetrievalResult {
        let original = self.search(original, bias).await;
        let anchored = self.search(semantic, bias).await;
        let best = Self::pick_better(original, anchored);

        if self.is_good_context(&best) {
            return best;
        }

        match self.search_with_rewrites(semantic, bias).await {
            Some(rewritten) => rewritten,
            None => best,
        }
    }

    /// Loose nearest-neighbour search for diagnostics
    pub async fn permissive_search(&self, question: &str) -> RetrievalResult {
        let text = self.normalizer.normalize_for_semantics(question);
        let vector = match self.embedder.embed(&text).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "Permissive search: embedding failed");
                return RetrievalResult::none();
            }
        };

        match self.store.near_vector(&vector, self.config.permissive_limit).await {
            Ok(chunks) => {
                let fragments: Vec<String> = chunks
                    .into_iter()
                    .filter(|c| c.distance.map_or(true, |d| d < self.config.permissive_distance))
                    .map(|c| c.content.trim().to_string())
                    .filter(|c| c.chars().count() > self.config.permissive_min_chars)
                    .collect();
                RetrievalResult::from_fragments(fragments, SearchMethod::VectorFallback, None)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Permissive search failed");
                RetrievalResult::none()
            }
        }
    }

    /// Standard retrieval and permissive search side by side
    pub async fn diagnose(&self, question: &str) -> DiagnosticSearch {
        let original = ResolvedQuery::new(question);
        let semantic = self.semantic_query(&original);
        let standard = self.retrieve(&original, &semantic, None).await;
        let permissive = self.permissive_search(question).await;
        DiagnosticSearch {
            standard,
            permissive,
        }
    }
}

fn hybrid_result(chunks: Vec<DocumentChunk>) -> RetrievalResult {
    let mut best: Option<f32> = None;
    let mut fragments = Vec::new();
    for chunk in chunks {
        let content = chunk.content.trim();
        if content.is_empty() {
            continue;
        }
        if let Some(score) = chunk.score {
            best = Some(best.map_or(score, |b| b.max(score)));
        }
        fragments.push(content.to_string());
    }
    RetrievalResult::from_fragments(fragments, SearchMethod::Hybrid, best)
}

fn vector_result(chunks: Vec<DocumentChunk>, max_distance: f32, min_chars: usize) -> RetrievalResult {
    let mut closest: Option<f32> = None;
    let mut fragments = Vec::new();
    for chunk in chunks {
        let Some(distance) = chunk.distance else {
            continue;
        };
        let content = chunk.content.trim();
        if distance >= max_distance || content.is_empty() || content.chars().count() < min_chars {
            continue;
        }
        closest = Some(closest.map_or(distance, |c| c.min(distance)));
        fragments.push(content.to_string());
    }
    RetrievalResult::from_fragments(
        fragments,
        SearchMethod::VectorFallback,
        closest.map(|d| 1.0 - d),
    )
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> docbot_core::Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }
        async fn is_available(&self) -> bool {
            true
        }
        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    /// Store that records hybrid queries and answers from canned chunks
    struct ScriptedStore {
        hybrid: Option<Vec<DocumentChunk>>,
        vector: Vec<DocumentChunk>,
        seen: Mutex<Vec<HybridQuery>>,
    }

    impl ScriptedStore {
        fn vector_only(vector: Vec<DocumentChunk>) -> Self {
            Self {
                hybrid: None,
                vector,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl VectorStore for ScriptedStore {
        async fn near_vector(&self, _v: &[f32], _limit: usize) -> docbot_core::Result<Vec<DocumentChunk>> {
            Ok(self.vector.clone())
        }
        fn supports_hybrid(&self) -> bool {
            self.hybrid.is_some()
        }
        async fn hybrid_search(&self, query: &HybridQuery) -> docbot_core::Result<Vec<DocumentChunk>> {
            self.seen.lock().push(query.clone());
            Ok(self.hybrid.clone().unwrap_or_default())
        }
        async fn is_ready(&self) -> bool {
            true
        }
        fn collection(&self) -> &str {
            "Documento"
        }
    }

    /// Hybrid-only store that answers just the queries `accept` lets through
    struct SelectiveStore {
        accept: fn(&str) -> bool,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl VectorStore for SelectiveStore {
        async fn near_vector(&self, _v: &[f32], _limit: usize) -> docbot_core::Result<Vec<DocumentChunk>> {
            Ok(Vec::new())
        }
        fn supports_hybrid(&self) -> bool {
            true
        }
        async fn hybrid_search(&self, query: &HybridQuery) -> docbot_core::Result<Vec<DocumentChunk>> {
            self.seen.lock().push(query.text.clone());
            if (self.accept)(&query.text) {
                Ok(vec![DocumentChunk::new(LONG).with_score(0.7)])
            } else {
                Ok(Vec::new())
            }
        }
        async fn is_ready(&self) -> bool {
            true
        }
        fn collection(&self) -> &str {
            "Documento"
        }
    }

    fn gateway_with<S: VectorStore>(store: S, config: RetrievalConfig) -> (RetrievalGateway, Arc<S>) {
        let store = Arc::new(store);
        let gw = RetrievalGateway::new(
            store.clone(),
            Arc::new(FixedEmbedder),
            Arc::new(QueryNormalizer::default()),
            config,
        );
        (gw, store)
    }

    fn gateway(store: ScriptedStore) -> (RetrievalGateway, Arc<ScriptedStore>) {
        gateway_with(store, RetrievalConfig::default())
    }

    const LONG: &str = "Para crear una cuenta contable ingrese al plan de cuentas y presione Nuevo.";

    #[tokio::test]
    async fn test_vector_fallback_filters_by_distance() {
        let (gw, _) = gateway(ScriptedStore::vector_only(vec![
            DocumentChunk::new(LONG).with_distance(0.2),
            DocumentChunk::new("lejano").with_distance(0.6),
            DocumentChunk::new("sin distancia"),
            DocumentChunk::new("   ").with_distance(0.1),
        ]));

        let result = gw.search(&ResolvedQuery::new("como creo una cuenta"), None).await;
        assert!(result.success);
        assert_eq!(result.results_count, 1);
        assert_eq!(result.search_method, SearchMethod::VectorFallback);
        assert!((result.score.unwrap() - 0.8).abs() < 1e-6);
        assert!(gw.is_good_context(&result));
    }

    #[tokio::test]
    async fn test_hybrid_preferred_and_bias_only_when_unanchored() {
        let store = ScriptedStore {
            hybrid: Some(vec![
                DocumentChunk::new(LONG).with_score(0.4),
                DocumentChunk::new("otro fragmento").with_score(0.9),
            ]),
            vector: Vec::new(),
            seen: Mutex::new(Vec::new()),
        };
        let (gw, store) = gateway(store);

        let result = gw.search(&ResolvedQuery::new("cuenta"), Some("asientos")).await;
        assert_eq!(result.search_method, SearchMethod::Hybrid);
        assert_eq!(result.score, Some(0.9));

        let anchored = ResolvedQuery::anchored("y eso", vec!["cuenta".into()]);
        gw.search(&anchored, Some("asientos")).await;

        let seen = store.seen.lock();
        assert_eq!(seen[0].bias.as_deref(), Some("asientos"));
        assert!(seen[0].vector.is_some());
        assert!(seen[1].bias.is_none());
        assert!(seen[1].text.contains("|| contexto_previo: cuenta"));
    }

    #[test]
    fn test_pick_better() {
        let low = RetrievalResult::from_fragments(vec!["a".into()], SearchMethod::Hybrid, Some(0.3));
        let high = RetrievalResult::from_fragments(vec!["b".into()], SearchMethod::Hybrid, Some(0.7));
        assert_eq!(RetrievalGateway::pick_better(low.clone(), high.clone()).score, Some(0.7));
        assert_eq!(RetrievalGateway::pick_better(high.clone(), low.clone()).score, Some(0.7));

        let none = RetrievalResult::none();
        assert!(RetrievalGateway::pick_better(none.clone(), low.clone()).success);
        assert!(RetrievalGateway::pick_better(low.clone(), none.clone()).success);

        // Same score: more results wins
        let two = RetrievalResult::from_fragments(vec!["x".into(), "y".into()], SearchMethod::Hybrid, Some(0.3));
        assert_eq!(RetrievalGateway::pick_better(two, low).results_count, 2);
    }

    #[test]
    fn test_good_context_threshold() {
        let (gw, _) = gateway(ScriptedStore::vector_only(Vec::new()));
        let short = RetrievalResult::from_fragments(vec!["corto".into()], SearchMethod::Hybrid, None);
        assert!(!gw.is_good_context(&short));
        let long = RetrievalResult::from_fragments(vec![LONG.into()], SearchMethod::Hybrid, None);
        assert!(gw.is_good_context(&long));
        assert!(!gw.is_good_context(&RetrievalResult::none()));
    }

    #[tokio::test]
    async fn test_empty_store_gives_none() {
        let (gw, _) = gateway(ScriptedStore::vector_only(Vec::new()));
        let semantic = gw.semantic_query(&ResolvedQuery::new("horario"));
        let result = gw.retrieve(&ResolvedQuery::new("horario"), &semantic, None).await;
        assert!(!result.success);
        assert!(gw.search_with_rewrites(&semantic, None).await.is_none());
    }

    #[tokio::test]
    async fn test_qualified_rewrite_wins() {
        let config = RetrievalConfig::default();
        let qualifier = config.domain_qualifier.clone();
        assert!(!qualifier.trim().is_empty());
        let store = SelectiveStore {
            accept: |text| text.ends_with("en el sistema"),
            seen: Mutex::new(Vec::new()),
        };
        let (gw, store) = gateway_with(store, config);

        let original = ResolvedQuery::new("como creo una cuenta");
        let semantic = gw.semantic_query(&original);
        let result = gw.retrieve(&original, &semantic, None).await;

        assert!(gw.is_good_context(&result));
        assert_eq!(result.search_method, SearchMethod::KeywordAugmented);
        assert_eq!(result.context_text(), LONG);

        let seen = store.seen.lock();
        assert_eq!(seen.len(), 3);
        assert!(seen[2].ends_with(qualifier.trim()));
    }

    #[tokio::test]
    async fn test_keyword_rewrite_wins() {
        let mut config = RetrievalConfig::default();
        config.domain_qualifier = String::new();
        let store = SelectiveStore {
            accept: |text| text == "registra cuenta",
            seen: Mutex::new(Vec::new()),
        };
        let (gw, store) = gateway_with(store, config);

        let query = ResolvedQuery::new("como se registra la cuenta");
        let result = gw.retrieve(&query, &query, None).await;

        assert!(gw.is_good_context(&result));
        assert_eq!(result.search_method, SearchMethod::KeywordAugmented);
        assert_eq!(
            *store.seen.lock(),
            vec![
                "como se registra la cuenta".to_string(),
                "como se registra la cuenta".to_string(),
                "registra cuenta".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_permissive_search_is_looser() {
        let (gw, _) = gateway(ScriptedStore::vector_only(vec![
            DocumentChunk::new(LONG).with_distance(0.6),
            DocumentChunk::new("muy corto").with_distance(0.1),
            DocumentChunk::new(LONG).with_distance(0.8),
        ]));
        let diag = gw.diagnose("cuenta").await;
        // Only the short fragment passes the standard cutoff
        assert_eq!(diag.standard.results_count, 1);
        assert!(!gw.is_good_context(&diag.standard));
        assert_eq!(diag.permissive.results_count, 1);
        assert!(gw.is_good_context(&diag.permissive));
    }

    #[test]
    fn test_semantic_query_keeps_anchor() {
        let (gw, _) = gateway(ScriptedStore::vector_only(Vec::new()));
        let q = ResolvedQuery::anchored("como cierro", vec!["ejercicio".into()]);
        let sem = gw.semantic_query(&q);
        assert_eq!(sem.anchor_keywords, vec!["ejercicio".to_string()]);
        assert!(sem.raw_query.contains("cerrar"));
    }
}
