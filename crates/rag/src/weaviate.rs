//! Weaviate vector store over GraphQL
//!
//! Read-only: the collection is populated by a separate ingestion job.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use docbot_config::VectorStoreSettings;
use docbot_core::{DocumentChunk, HybridQuery, VectorStore};

use crate::RagError;

/// Vector store configuration
#[derive(Debug, Clone)]
pub struct WeaviateConfig {
    /// REST endpoint
    pub endpoint: String,
    pub api_key: Option<String>,
    /// Collection (class) name
    pub collection: String,
    /// Property holding the fragment text
    pub content_property: String,
    pub timeout: Duration,
}

impl Default for WeaviateConfig {
    fn default() -> Self {
        Self::from(&VectorStoreSettings::default())
    }
}

impl From<&VectorStoreSettings> for WeaviateConfig {
    fn from(settings: &VectorStoreSettings) -> Self {
        Self {
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            collection: settings.collection.clone(),
            content_property: settings.content_property.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }
}

#[derive(Debug, Serialize)]
struct GraphQlRequest {
    query: String,
}

/// Weaviate client
pub struct WeaviateStore {
    client: Client,
    config: WeaviateConfig,
}

impl WeaviateStore {
    pub fn new(config: WeaviateConfig) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RagError::Connection(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Build the nearVector query
    fn near_vector_query(&self, vector: &[f32], limit: usize) -> String {
        format!(
            "{{ Get {{ {class}(nearVector: {{vector: {vector}}}, limit: {limit}) {{ {prop} _additional {{ distance }} }} }} }}",
            class = self.config.collection,
            vector = format_vector(vector),
            limit = limit,
            prop = self.config.content_property,
        )
    }

    /// Build the hybrid query
    fn hybrid_query(&self, query: &HybridQuery) -> String {
        let vector = query
            .vector
            .as_deref()
            .map(|v| format!(", vector: {}", format_vector(v)))
            .unwrap_or_default();

        format!(
            "{{ Get {{ {class}(hybrid: {{query: {text}, alpha: {alpha}{vector}}}, limit: {limit}) {{ {prop} _additional {{ score }} }} }} }}",
            class = self.config.collection,
            text = graphql_string(&query.keyword_text()),
            alpha = query.alpha,
            vector = vector,
            limit = query.limit,
            prop = self.config.content_property,
        )
    }

    /// Run a GraphQL query and return the object list for the collection
    async fn execute(&self, query: String) -> Result<Vec<Value>, RagError> {
        let url = format!("{}/v1/graphql", self.config.endpoint);

        let response = self
            .request(self.client.post(&url))
            .json(&GraphQlRequest { query })
            .send()
            .await
            .map_err(|e| RagError::VectorStore(format!("GraphQL request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::VectorStore(format!(
                "GraphQL query failed: {} - {}",
                status, body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| RagError::InvalidResponse(e.to_string()))?;

        if let Some(errors) = body.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                let messages: Vec<&str> = errors
                    .iter()
                    .filter_map(|e| e.get("message").and_then(Value::as_str))
                    .collect();
                return Err(RagError::VectorStore(format!(
                    "GraphQL errors: {}",
                    messages.join("; ")
                )));
            }
        }

        Ok(body
            .get("data")
            .and_then(|d| d.get("Get"))
            .and_then(|g| g.get(&self.config.collection))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    fn to_chunk(&self, object: &Value) -> Option<DocumentChunk> {
        let content = object.get(&self.config.content_property)?.as_str()?;
        let additional = object.get("_additional");

        let mut chunk = DocumentChunk::new(content);
        if let Some(distance) = additional.and_then(|a| a.get("distance")).and_then(parse_number) {
            chunk = chunk.with_distance(distance);
        }
        if let Some(score) = additional.and_then(|a| a.get("score")).and_then(parse_number) {
            chunk = chunk.with_score(score);
        }
        Some(chunk)
    }

    pub async fn search_near_vector(
        &self,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<DocumentChunk>, RagError> {
        if vector.is_empty() {
            return Err(RagError::Search("Empty query vector".to_string()));
        }
        let objects = self.execute(self.near_vector_query(vector, limit)).await?;
        Ok(objects.iter().filter_map(|o| self.to_chunk(o)).collect())
    }

    pub async fn search_hybrid(&self, query: &HybridQuery) -> Result<Vec<DocumentChunk>, RagError> {
        let objects = self.execute(self.hybrid_query(query)).await?;
        Ok(objects.iter().filter_map(|o| self.to_chunk(o)).collect())
    }

    /// Readiness check
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/v1/.well-known/ready", self.config.endpoint);
        match self.request(self.client.get(&url)).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "Vector store readiness check failed");
                false
            }
        }
    }

    /// Poll readiness, sleeping `delay` between attempts
    pub async fn wait_until_ready(&self, attempts: u32, delay: Duration) -> Result<(), RagError> {
        for attempt in 1..=attempts.max(1) {
            if self.health_check().await {
                tracing::info!(
                    endpoint = %self.config.endpoint,
                    collection = %self.config.collection,
                    "Vector store ready"
                );
                return Ok(());
            }
            tracing::warn!(attempt, attempts, "Vector store not ready, retrying");
            if attempt < attempts {
                tokio::time::sleep(delay).await;
            }
        }

        Err(RagError::Connection(format!(
            "Vector store at {} not ready after {} attempts",
            self.config.endpoint, attempts
        )))
    }

    pub fn config(&self) -> &WeaviateConfig {
        &self.config
    }
}

#[async_trait]
impl VectorStore for WeaviateStore {
    async fn near_vector(&self, vector: &[f32], limit: usize) -> docbot_core::Result<Vec<DocumentChunk>> {
        self.search_near_vector(vector, limit).await.map_err(Into::into)
    }

    fn supports_hybrid(&self) -> bool {
        true
    }

    async fn hybrid_search(&self, query: &HybridQuery) -> docbot_core::Result<Vec<DocumentChunk>> {
        self.search_hybrid(query).await.map_err(Into::into)
    }

    async fn is_ready(&self) -> bool {
        self.health_check().await
    }

    fn collection(&self) -> &str {
        &self.config.collection
    }
}

fn format_vector(vector: &[f32]) -> String {
    let parts: Vec<String> = vector.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

/// Quote and escape a string literal for GraphQL
fn graphql_string(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}

/// Weaviate reports `score` as a string and `distance` as a number
fn parse_number(value: &Value) -> Option<f32> {
    match value {
        Value::Number(n) => n.as_f64().map(|f| f as f32),
        Value::String(s) => s.trim().parse::<f32>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> WeaviateStore {
        WeaviateStore::new(WeaviateConfig::default()).unwrap()
    }

    #[test]
    fn test_near_vector_query_shape() {
        let q = store().near_vector_query(&[0.5, -1.0], 5);
        assert!(q.contains("Documento(nearVector: {vector: [0.5, -1]}, limit: 5)"));
        assert!(q.contains("contenido _additional { distance }"));
    }

    #[test]
    fn test_hybrid_query_escapes_text() {
        let query = HybridQuery::new("cuenta \"contable\"", 3, 0.5).with_bias("asiento");
        let q = store().hybrid_query(&query);
        assert!(q.contains(r#"query: "cuenta \"contable\" asiento""#));
        assert!(q.contains("alpha: 0.5"));
        assert!(!q.contains("vector:"));

        let q = store().hybrid_query(&query.with_vector(vec![1.0]));
        assert!(q.contains("vector: [1]"));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(&json!("0.75")), Some(0.75));
        assert_eq!(parse_number(&json!(0.25)), Some(0.25));
        assert_eq!(parse_number(&json!("n/a")), None);
        assert_eq!(parse_number(&json!(null)), None);
    }

    #[test]
    fn test_to_chunk() {
        let s = store();
        let chunk = s
            .to_chunk(&json!({"contenido": "texto", "_additional": {"score": "0.9"}}))
            .unwrap();
        assert_eq!(chunk.content, "texto");
        assert_eq!(chunk.score, Some(0.9));
        assert_eq!(chunk.distance, None);

        assert!(s.to_chunk(&json!({"otro": "x"})).is_none());
    }
}
