//! The streaming chat endpoint.

use axum::extract::State;
use axum::response::Response;
use axum::Json;

use crate::error::ChatError;
use crate::schemas::ChatRequest;
use crate::server::state::AppState;
use crate::streaming::chat_stream_response;

/// `POST /api/chat`. Validation failures are HTTP 400; everything after
/// validation is reported in-stream.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ChatError> {
    request.validate()?;
    Ok(chat_stream_response(state, request))
}
