//! Conversation CRUD handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use crate::error::ChatError;
use crate::schemas::{ConversationCreate, ConversationUpdate};
use crate::server::state::AppState;
use crate::store::{Conversation, ConversationDetail, ConversationSummary};

/// `GET /api/conversations`, newest first.
pub async fn list(
    State(state): State<AppState>,
) -> Result<Json<Vec<ConversationSummary>>, ChatError> {
    Ok(Json(state.store.list_conversations().await?))
}

/// `POST /api/conversations`.
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<ConversationCreate>,
) -> Result<(StatusCode, Json<Conversation>), ChatError> {
    let title = body
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "New Chat".to_string());
    let conversation = state
        .store
        .create_conversation(title, body.system_prompt)
        .await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// `GET /api/conversations/{id}` with messages in creation order.
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationDetail>, ChatError> {
    state
        .store
        .get_conversation(&id)
        .await?
        .map(Json)
        .ok_or(ChatError::NotFound("Conversation"))
}

/// `PATCH /api/conversations/{id}`. Returns the updated detail.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ConversationUpdate>,
) -> Result<Json<ConversationDetail>, ChatError> {
    if body.title.is_none() && body.system_prompt.is_none() {
        return Err(ChatError::Validation("no fields to update".to_string()));
    }
    let updated = state
        .store
        .update_conversation(&id, body.title, body.system_prompt)
        .await?;
    if !updated {
        return Err(ChatError::NotFound("Conversation"));
    }
    state
        .store
        .get_conversation(&id)
        .await?
        .map(Json)
        .ok_or(ChatError::NotFound("Conversation"))
}

/// `DELETE /api/conversations/{id}`, cascading to messages.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ChatError> {
    if !state.store.delete_conversation(&id).await? {
        return Err(ChatError::NotFound("Conversation"));
    }
    Ok(Json(json!({"status": "deleted"})))
}
