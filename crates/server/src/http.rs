//! HTTP Endpoints
//!
//! REST API for the documentation chatbot.

use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::ServerError;

/// Header carrying the conversation id
pub const SESSION_HEADER: &str = "x-session-id";

/// Session used when the client sends no id
pub const DEFAULT_SESSION_ID: &str = "default_session";

const NO_JSON: &str = "No se enviaron datos JSON";
const NO_QUESTION: &str = "No se proporcionó pregunta";

/// Upper bound for one request, including retries against the model
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

const ENDPOINTS: &[&str] = &[
    "POST /chat",
    "POST /clear_chat_history",
    "GET /health",
    "GET /api/info",
];

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let server = &state.config.server;
    let cors_layer = build_cors_layer(&server.cors_origins, server.cors_enabled);
    let base_path = normalize_base_path(&server.base_path);

    let mut api = Router::new()
        .route("/chat", post(chat))
        .route("/clear_chat_history", post(clear_chat_history))
        .route("/health", get(health_check))
        .route("/api/info", get(api_info));

    if server.debug_endpoints {
        tracing::warn!("Debug endpoints enabled at /debug/search");
        api = api.route("/debug/search", post(debug_search));
    }

    let router = match base_path {
        Some(prefix) => {
            tracing::info!(base_path = %prefix, "Mounting API under base path");
            Router::new().nest(&prefix, api)
        }
        None => api,
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(cors_layer)
        .with_state(state)
}

/// `"/chatbotia/"` → `Some("/chatbotia")`, empty or `/` → `None`
fn normalize_base_path(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!("/{}", trimmed))
    }
}

/// Build CORS layer from configured origins
///
/// - If cors_enabled is false, returns a permissive layer
/// - If cors_origins is empty, defaults to localhost:3000
/// - Otherwise, uses the configured origins
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins");
        return CorsLayer::permissive();
    }

    let mut parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    if parsed_origins.is_empty() {
        tracing::info!("No usable CORS origins configured, defaulting to localhost:3000");
        parsed_origins.push(HeaderValue::from_static("http://localhost:3000"));
    } else {
        tracing::info!("CORS configured with {} origins", parsed_origins.len());
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed_origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(SESSION_HEADER)])
        .allow_credentials(true)
}

fn session_id(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(DEFAULT_SESSION_ID)
        .to_string()
}

/// Question payload shared by `/chat` and `/debug/search`
#[derive(Debug, Deserialize)]
struct QuestionRequest {
    #[serde(default)]
    question: Option<String>,
}

impl QuestionRequest {
    fn from_payload(payload: Result<Json<Self>, JsonRejection>) -> Result<String, ServerError> {
        let Json(request) = payload.map_err(|e| {
            tracing::debug!(error = %e, "Rejected request body");
            ServerError::InvalidRequest(NO_JSON.to_string())
        })?;

        request
            .question
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .ok_or_else(|| ServerError::InvalidRequest(NO_QUESTION.to_string()))
    }
}

/// Chat endpoint
async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<QuestionRequest>, JsonRejection>,
) -> Result<Response, ServerError> {
    let question = QuestionRequest::from_payload(payload)?;
    let session_id = session_id(&headers);

    tracing::info!(session_id = %session_id, question = %question, "Chat request");

    let response = state.agent.process_question(&question, &session_id).await;
    let status = if response.is_error() {
        tracing::error!(session_id = %session_id, error = %response.text(), "Chat turn failed");
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };

    Ok((status, Json(response)).into_response())
}

/// Drop the conversation of the calling session
async fn clear_chat_history(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session_id = session_id(&headers);

    if state.agent.clear_history(&session_id).await {
        Json(serde_json::json!({
            "status": "success",
            "message": "Historial limpiado.",
        }))
        .into_response()
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "status": "error",
                "message": "No se pudo limpiar el historial.",
            })),
        )
            .into_response()
    }
}

/// Collaborator health
async fn health_check(State(state): State<AppState>) -> Response {
    let report = state.agent.health().await;
    let status = if report.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report)).into_response()
}

async fn api_info(State(state): State<AppState>) -> impl IntoResponse {
    let mut endpoints: Vec<&str> = ENDPOINTS.to_vec();
    if state.config.server.debug_endpoints {
        endpoints.push("POST /debug/search");
    }

    Json(serde_json::json!({
        "name": "EasySoft Chatbot API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "active_sessions": state.agent.active_sessions(),
        "endpoints": endpoints,
    }))
}

/// Standard vs permissive retrieval for a question
async fn debug_search(
    State(state): State<AppState>,
    payload: Result<Json<QuestionRequest>, JsonRejection>,
) -> Result<Response, ServerError> {
    let question = QuestionRequest::from_payload(payload)?;
    let diagnostics = state.agent.diagnose(&question).await;
    Ok(Json(diagnostics).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_path() {
        assert_eq!(normalize_base_path(""), None);
        assert_eq!(normalize_base_path("/"), None);
        assert_eq!(normalize_base_path("chatbotia"), Some("/chatbotia".to_string()));
        assert_eq!(normalize_base_path("/chatbotia/"), Some("/chatbotia".to_string()));
    }

    #[test]
    fn test_session_id_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_id(&headers), DEFAULT_SESSION_ID);

        headers.insert(SESSION_HEADER, HeaderValue::from_static("  "));
        assert_eq!(session_id(&headers), DEFAULT_SESSION_ID);

        headers.insert(SESSION_HEADER, HeaderValue::from_static("abc-123"));
        assert_eq!(session_id(&headers), "abc-123");
    }

    #[test]
    fn test_cors_layer_variants() {
        let _ = build_cors_layer(&[], true);
        let _ = build_cors_layer(&["not a header\n".to_string()], true);
        let _ = build_cors_layer(&["https://easysoft.com.ar".to_string()], true);
        let _ = build_cors_layer(&[], false);
    }
}
