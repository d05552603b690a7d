//! HTTP-level tests for the CRUD surfaces: conversations, prompts,
//! providers, and the admin endpoints.

mod common;

use common::{app, request, state_with_provider};
use serde_json::{json, Value};

#[tokio::test]
async fn conversation_crud_round_trip() {
    let state = state_with_provider("demo", "http://127.0.0.1:1/v1", "k").await;

    let (status, body) = request(
        app(&state),
        "POST",
        "/api/conversations",
        Some(json!({"title": "Rust questions", "system_prompt": "Be terse."})),
    )
    .await;
    assert_eq!(status, 201);
    let created: Value = serde_json::from_str(&body).unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    state
        .store
        .append_message(&id, "user", "what is Send".into(), None, None)
        .await
        .unwrap();

    let (status, body) = request(app(&state), "GET", "/api/conversations", None).await;
    assert_eq!(status, 200);
    let listed: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(listed[0]["id"], id.as_str());
    assert_eq!(listed[0]["message_count"], 1);
    assert_eq!(listed[0]["preview"], "what is Send");

    let (status, body) = request(
        app(&state),
        "PATCH",
        &format!("/api/conversations/{id}"),
        Some(json!({"title": "Renamed"})),
    )
    .await;
    assert_eq!(status, 200);
    let updated: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(updated["title"], "Renamed");
    assert_eq!(updated["messages"].as_array().unwrap().len(), 1);

    let (status, _) = request(
        app(&state),
        "DELETE",
        &format!("/api/conversations/{id}"),
        None,
    )
    .await;
    assert_eq!(status, 200);

    let (status, _) = request(
        app(&state),
        "GET",
        &format!("/api/conversations/{id}"),
        None,
    )
    .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn empty_conversation_title_defaults() {
    let state = state_with_provider("demo", "http://127.0.0.1:1/v1", "k").await;
    let (_, body) = request(app(&state), "POST", "/api/conversations", Some(json!({}))).await;
    let created: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(created["title"], "New Chat");
}

#[tokio::test]
async fn prompt_crud_round_trip() {
    let state = state_with_provider("demo", "http://127.0.0.1:1/v1", "k").await;

    let (status, body) = request(
        app(&state),
        "POST",
        "/api/prompts",
        Some(json!({"title": "Reviewer", "content": "You review Rust code."})),
    )
    .await;
    assert_eq!(status, 201);
    let created: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(created["category"], "General");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, _) = request(
        app(&state),
        "PUT",
        &format!("/api/prompts/{id}"),
        Some(json!({"is_favorite": true})),
    )
    .await;
    assert_eq!(status, 200);

    let (_, body) = request(app(&state), "GET", "/api/prompts", None).await;
    let listed: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(listed[0]["is_favorite"], true);

    let (status, _) = request(app(&state), "DELETE", &format!("/api/prompts/{id}"), None).await;
    assert_eq!(status, 200);
    let (status, _) = request(
        app(&state),
        "PUT",
        &format!("/api/prompts/{id}"),
        Some(json!({"title": "x"})),
    )
    .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn provider_listing_masks_keys() {
    let state =
        state_with_provider("demo", "http://127.0.0.1:1/v1", "sk-test-0123456789abcd").await;

    let (status, body) = request(app(&state), "GET", "/api/providers", None).await;
    assert_eq!(status, 200);
    let listed: Value = serde_json::from_str(&body).unwrap();
    let key = listed[0]["api_key"].as_str().unwrap();
    assert!(key.starts_with("sk-test-"));
    assert!(key.ends_with("abcd"));
    assert!(key.contains('\u{2022}'));
}

#[tokio::test]
async fn custom_providers_can_be_added_updated_and_removed() {
    let state = state_with_provider("demo", "http://127.0.0.1:1/v1", "k").await;

    let (status, body) = request(
        app(&state),
        "POST",
        "/api/providers",
        Some(json!({
            "name": "local",
            "display_name": "Local Ollama",
            "base_url": "http://localhost:11434/v1",
            "api_key": "ollama",
            "default_model": "llama3"
        })),
    )
    .await;
    assert_eq!(status, 201);
    let created: Value = serde_json::from_str(&body).unwrap();
    // local-backend sentinel keys are not masked
    assert_eq!(created["api_key"], "ollama");
    assert_eq!(created["is_custom"], true);

    let (status, body) = request(
        app(&state),
        "PUT",
        "/api/providers/local",
        Some(json!({"display_name": "Ollama (edited)"})),
    )
    .await;
    assert_eq!(status, 200);
    let updated: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(updated["display_name"], "Ollama (edited)");

    let (status, _) = request(app(&state), "DELETE", "/api/providers/local", None).await;
    assert_eq!(status, 200);

    // static providers cannot be deleted
    let (status, _) = request(app(&state), "DELETE", "/api/providers/demo", None).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn provider_create_rejects_malformed_base_url() {
    let state = state_with_provider("demo", "http://127.0.0.1:1/v1", "k").await;
    let (status, _) = request(
        app(&state),
        "POST",
        "/api/providers",
        Some(json!({
            "name": "broken",
            "display_name": "Broken",
            "base_url": "not a url"
        })),
    )
    .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn provider_update_unknown_name_is_404() {
    let state = state_with_provider("demo", "http://127.0.0.1:1/v1", "k").await;
    let (status, body) = request(
        app(&state),
        "PUT",
        "/api/providers/ghost",
        Some(json!({"display_name": "Ghost"})),
    )
    .await;
    assert_eq!(status, 404);
    let error: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(error["error"]["message"], "Provider ghost not found");
}

#[tokio::test]
async fn health_reports_service_identity() {
    let state = state_with_provider("demo", "http://127.0.0.1:1/v1", "k").await;
    let (status, body) = request(app(&state), "GET", "/api/health", None).await;
    assert_eq!(status, 200);
    let health: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["service"], "omni_chat_llm");
    assert!(health["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn config_reload_succeeds_for_in_memory_config() {
    let state = state_with_provider("demo", "http://127.0.0.1:1/v1", "k").await;
    let (status, body) = request(app(&state), "POST", "/api/admin/config/reload", None).await;
    assert_eq!(status, 200);
    let reloaded: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(reloaded["status"], "reloaded");
    assert_eq!(reloaded["providers"], 1);
}
