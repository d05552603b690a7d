//! Provider administration handlers. API keys never leave this surface
//! unmasked; the streaming path reads the real keys from the registry.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;
use url::Url;

use crate::discovery;
use crate::error::ChatError;
use crate::providers::Provider;
use crate::schemas::{ProviderCreate, ProviderTestResult, ProviderUpdate};
use crate::server::state::AppState;

/// `GET /api/providers`: the merged static+custom table, keys masked,
/// configuration order preserved.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Provider>>, ChatError> {
    let providers = state
        .registry
        .list_all()
        .await?
        .into_values()
        .map(|p| p.masked())
        .collect();
    Ok(Json(providers))
}

/// `POST /api/providers`: add (or replace) a custom provider.
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<ProviderCreate>,
) -> Result<(StatusCode, Json<Provider>), ChatError> {
    Url::parse(&body.base_url)
        .map_err(|e| ChatError::Validation(format!("invalid base_url: {e}")))?;
    let provider = Provider {
        name: body.name,
        display_name: body.display_name,
        base_url: body.base_url,
        api_key: body.api_key,
        default_model: body.default_model,
        compatibility_mode: body.compatibility_mode,
        icon: body.icon,
        is_custom: true,
        models: body.models,
    };
    state.store.save_custom_provider(provider.clone()).await?;
    Ok((StatusCode::CREATED, Json(provider.masked())))
}

/// `PUT /api/providers/{name}`: merge the given fields over the current
/// provider and persist the result as a custom row. Editing a static
/// provider shadows it.
pub async fn update(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<ProviderUpdate>,
) -> Result<Json<Provider>, ChatError> {
    let Some(mut provider) = state.registry.resolve(&name).await? else {
        return Err(ChatError::ProviderNotFound(name));
    };
    if let Some(display_name) = body.display_name {
        provider.display_name = display_name;
    }
    if let Some(base_url) = body.base_url {
        Url::parse(&base_url)
            .map_err(|e| ChatError::Validation(format!("invalid base_url: {e}")))?;
        provider.base_url = base_url;
    }
    if let Some(api_key) = body.api_key {
        provider.api_key = api_key;
    }
    if let Some(default_model) = body.default_model {
        provider.default_model = default_model;
    }
    if let Some(icon) = body.icon {
        provider.icon = icon;
    }
    provider.is_custom = true;
    state.store.save_custom_provider(provider.clone()).await?;
    Ok(Json(provider.masked()))
}

/// `DELETE /api/providers/{name}`: remove a custom row. Static providers
/// cannot be removed and report not found.
pub async fn delete(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, ChatError> {
    if !state.store.delete_custom_provider(&name).await? {
        return Err(ChatError::ProviderNotFound(name));
    }
    Ok(Json(json!({"status": "deleted"})))
}

/// `GET /api/providers/{name}/models`: live model list from the endpoint,
/// falling back to the configured list when discovery yields nothing.
pub async fn models(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, ChatError> {
    let Some(provider) = state.registry.resolve(&name).await? else {
        return Err(ChatError::ProviderNotFound(name));
    };
    let mut models = discovery::fetch_models(&state.http_client, &provider).await;
    if models.is_empty() {
        models = provider.models.clone();
    }
    Ok(Json(json!({"provider": provider.name, "models": models})))
}

/// `POST /api/providers/{name}/test`: one-shot connectivity probe. A failed
/// probe is still HTTP 200.
pub async fn test(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ProviderTestResult>, ChatError> {
    let Some(provider) = state.registry.resolve(&name).await? else {
        return Err(ChatError::ProviderNotFound(name));
    };
    let model = if provider.default_model.is_empty() {
        provider
            .models
            .first()
            .cloned()
            .ok_or_else(|| ChatError::Validation("provider has no model to test with".to_string()))?
    } else {
        provider.default_model.clone()
    };
    let result = discovery::probe(&state.http_client, &provider, &model).await;
    Ok(Json(result))
}
