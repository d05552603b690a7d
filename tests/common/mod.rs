//! Shared scaffolding for the HTTP-level tests: an in-memory provider table
//! plus a temp-file database, wired into the real router.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::Request;
use axum::Router;
use http_body_util::BodyExt;
use indexmap::IndexMap;
use omni_chat_llm::config::{FileConfig, ProviderEntry, SharedConfig};
use omni_chat_llm::server::{create_router, AppState};
use omni_chat_llm::store::Store;

/// State with one configured provider pointing at `base_url`.
pub async fn state_with_provider(name: &str, base_url: &str, api_key: &str) -> AppState {
    let mut llm_providers = IndexMap::new();
    llm_providers.insert(
        name.to_string(),
        ProviderEntry {
            display_name: Some(name.to_uppercase()),
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            default_model: "m1".to_string(),
            models: vec!["m1".to_string()],
            ..Default::default()
        },
    );
    let config = SharedConfig::from_value(FileConfig {
        llm_providers,
        defaults: Default::default(),
    });

    let path = std::env::temp_dir().join(format!(
        "ocllm-it-{}.db",
        uuid::Uuid::new_v4().simple()
    ));
    let store = Store::open(&path).await.expect("open temp store");
    AppState::from_parts(config, store).expect("build state")
}

pub fn app(state: &AppState) -> Router {
    create_router(state.clone())
}

/// One-shot JSON request against the router.
pub async fn request(
    router: Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (axum::http::StatusCode, String) {
    use tower::ServiceExt;

    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("build request");

    let response = router.oneshot(request).await.expect("router response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

/// Decode the `data:` payloads of an SSE body.
pub fn sse_frames(body: &str) -> Vec<serde_json::Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(|data| serde_json::from_str(data).expect("frame is JSON"))
        .collect()
}
