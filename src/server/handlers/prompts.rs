//! Prompt library CRUD handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use crate::error::ChatError;
use crate::schemas::{PromptCreate, PromptUpdate};
use crate::server::state::AppState;
use crate::store::Prompt;

/// `GET /api/prompts`, newest first.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Prompt>>, ChatError> {
    Ok(Json(state.store.list_prompts().await?))
}

/// `POST /api/prompts`.
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<PromptCreate>,
) -> Result<(StatusCode, Json<Prompt>), ChatError> {
    let prompt = state.store.create_prompt(body).await?;
    Ok((StatusCode::CREATED, Json(prompt)))
}

/// `PUT /api/prompts/{id}`, partial update.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<PromptUpdate>,
) -> Result<Json<serde_json::Value>, ChatError> {
    if body.title.is_none()
        && body.content.is_none()
        && body.category.is_none()
        && body.tags.is_none()
        && body.is_favorite.is_none()
    {
        return Err(ChatError::Validation("no fields to update".to_string()));
    }
    if !state.store.update_prompt(&id, body).await? {
        return Err(ChatError::NotFound("Prompt"));
    }
    Ok(Json(json!({"status": "updated"})))
}

/// `DELETE /api/prompts/{id}`.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ChatError> {
    if !state.store.delete_prompt(&id).await? {
        return Err(ChatError::NotFound("Prompt"));
    }
    Ok(Json(json!({"status": "deleted"})))
}
