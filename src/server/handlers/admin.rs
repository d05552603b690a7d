//! Health and configuration administration.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::error::ChatError;
use crate::server::state::AppState;

/// `GET /api/health`.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// `POST /api/admin/config/reload`: re-read the YAML file and swap the
/// snapshot. In-flight requests keep the snapshot they already took.
pub async fn reload_config(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ChatError> {
    state.config.reload()?;
    let providers = state.config.snapshot().llm_providers.len();
    Ok(Json(json!({"status": "reloaded", "providers": providers})))
}
