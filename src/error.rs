//! # Error Types
//!
//! The single error taxonomy used across the crate. Every failure that
//! reaches an HTTP boundary is translated into a JSON error body; every
//! failure that reaches a stream boundary is translated into an `error`
//! stream event by the orchestrator.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    /// The request named a provider that exists in neither the static
    /// configuration table nor the custom provider store.
    #[error("Provider {0} not found")]
    ProviderNotFound(String),

    /// Malformed or out-of-range request fields, rejected before any work.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The model provider's transport or API failed or timed out.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Persistence failed (conversation creation, message append, ...).
    #[error("Store error: {0}")]
    Store(String),

    /// A named resource was not found ("Conversation", "Prompt", ...).
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anything unanticipated. Kept scoped to a single request.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            ChatError::ProviderNotFound(_) => (StatusCode::NOT_FOUND, "provider_not_found"),
            ChatError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ChatError::Validation(_) => (StatusCode::BAD_REQUEST, "invalid_request_error"),
            ChatError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
            ChatError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
            ChatError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            ChatError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = Json(json!({
            "error": {
                "message": self.to_string(),
                "type": kind,
                "code": null
            }
        }));

        (status, body).into_response()
    }
}

impl From<rusqlite::Error> for ChatError {
    fn from(err: rusqlite::Error) -> Self {
        ChatError::Store(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ChatError {
    fn from(err: tokio::task::JoinError) -> Self {
        ChatError::Internal(format!("blocking task failed: {err}"))
    }
}

impl From<reqwest::Error> for ChatError {
    /// Classify HTTP client failures so messages stay meaningful without
    /// leaking request internals.
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ChatError::Upstream("request timed out - provider did not respond in time".to_string())
        } else if err.is_connect() {
            ChatError::Upstream("connection failed - unable to reach provider".to_string())
        } else if let Some(status) = err.status() {
            ChatError::Upstream(format!("HTTP {}: {}", status.as_u16(), err))
        } else {
            ChatError::Upstream(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::Internal(format!("JSON error: {err}"))
    }
}

impl From<serde_yaml::Error> for ChatError {
    fn from(err: serde_yaml::Error) -> Self {
        ChatError::Config(err.to_string())
    }
}

impl From<std::io::Error> for ChatError {
    fn from(err: std::io::Error) -> Self {
        ChatError::Internal(format!("I/O error: {err}"))
    }
}
