//! Documentation chatbot server
//!
//! Provides the HTTP endpoints in front of the chatbot agent.

pub mod http;
pub mod state;

pub use http::create_router;
pub use state::AppState;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("{0}")]
    InvalidRequest(String),
}

impl From<ServerError> for StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (StatusCode::from(self), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_request_is_bad_request() {
        let err = ServerError::InvalidRequest("No se proporcionó pregunta".into());
        assert_eq!(err.to_string(), "No se proporcionó pregunta");
        assert_eq!(StatusCode::from(err), StatusCode::BAD_REQUEST);
    }
}
