//! # Model Discovery
//!
//! Two best-effort provider queries used by the administration surface:
//! listing the models an endpoint serves and probing an endpoint with a
//! minimal completion. Neither ever fails the request that triggered it;
//! discovery errors become an empty list, probe errors become a failed
//! [`ProviderTestResult`].

use std::time::Instant;

use serde_json::json;
use tracing::warn;

use crate::providers::Provider;
use crate::schemas::ProviderTestResult;

/// Fetch the model identifiers served at `{base_url}/models`.
///
/// Accepts both the OpenAI shape (`{"data": [{"id": ...}]}`) and a bare
/// array. Returns a sorted list; any transport or parse failure is logged
/// and yields an empty list.
pub async fn fetch_models(http: &reqwest::Client, provider: &Provider) -> Vec<String> {
    let url = format!("{}/models", provider.base_url.trim_end_matches('/'));
    let mut request = http.get(&url);
    if !provider.api_key.is_empty() {
        request = request.bearer_auth(&provider.api_key);
    }

    let value: serde_json::Value = match request.send().await {
        Ok(response) => match response.error_for_status() {
            Ok(response) => match response.json().await {
                Ok(value) => value,
                Err(e) => {
                    warn!(provider = %provider.name, "model list is not valid JSON: {e}");
                    return Vec::new();
                }
            },
            Err(e) => {
                warn!(provider = %provider.name, "model list request rejected: {e}");
                return Vec::new();
            }
        },
        Err(e) => {
            warn!(provider = %provider.name, "model list request failed: {e}");
            return Vec::new();
        }
    };

    let entries = value
        .get("data")
        .and_then(|d| d.as_array())
        .or_else(|| value.as_array());
    let mut models: Vec<String> = entries
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    item.get("id")
                        .and_then(|id| id.as_str())
                        .or_else(|| item.as_str())
                })
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    models.sort();
    models
}

/// Probe a provider with a tiny non-streaming completion and report the
/// outcome with a round-trip time. Never returns an HTTP-level error; a
/// failed probe is a successful response with `success: false`.
pub async fn probe(http: &reqwest::Client, provider: &Provider, model: &str) -> ProviderTestResult {
    let url = format!(
        "{}/chat/completions",
        provider.base_url.trim_end_matches('/')
    );
    let body = json!({
        "model": model,
        "messages": [{"role": "user", "content": "Say 'ok'"}],
        "max_tokens": 5,
        "stream": false,
    });

    let mut request = http.post(&url).json(&body);
    if !provider.api_key.is_empty() {
        request = request.bearer_auth(&provider.api_key);
    }

    let started = Instant::now();
    match request.send().await {
        Ok(response) => {
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            let status = response.status();
            if status.is_success() {
                ProviderTestResult {
                    success: true,
                    message: format!("Connection successful ({model})"),
                    response_time_ms: Some(elapsed_ms),
                }
            } else {
                let detail = response.text().await.unwrap_or_default();
                ProviderTestResult {
                    success: false,
                    message: format!("HTTP {status}: {detail}"),
                    response_time_ms: Some(elapsed_ms),
                }
            }
        }
        Err(e) => ProviderTestResult {
            success: false,
            message: format!("Connection failed: {e}"),
            response_time_ms: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::CompatibilityMode;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(base_url: &str) -> Provider {
        Provider {
            name: "demo".into(),
            display_name: "Demo".into(),
            base_url: base_url.to_string(),
            api_key: "sk-demo".into(),
            default_model: "m1".into(),
            compatibility_mode: CompatibilityMode::OpenaiCompatible,
            icon: "settings".into(),
            is_custom: false,
            models: vec![],
        }
    }

    #[tokio::test]
    async fn fetch_models_parses_openai_shape_sorted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"id": "zephyr"}, {"id": "alpha"}]
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&format!("{}/v1", server.uri()));
        let models = fetch_models(&reqwest::Client::new(), &provider).await;
        assert_eq!(models, vec!["alpha", "zephyr"]);
    }

    #[tokio::test]
    async fn fetch_models_tolerates_failure() {
        let provider = provider_for("http://127.0.0.1:1/v1");
        let models = fetch_models(&reqwest::Client::new(), &provider).await;
        assert!(models.is_empty());
    }

    #[tokio::test]
    async fn probe_reports_success_with_timing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "ok"}}]
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&format!("{}/v1", server.uri()));
        let result = probe(&reqwest::Client::new(), &provider, "m1").await;
        assert!(result.success);
        assert!(result.response_time_ms.is_some());
    }

    #[tokio::test]
    async fn probe_reports_upstream_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let provider = provider_for(&format!("{}/v1", server.uri()));
        let result = probe(&reqwest::Client::new(), &provider, "m1").await;
        assert!(!result.success);
        assert!(result.message.contains("401"));
    }
}
