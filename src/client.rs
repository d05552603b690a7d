//! # Model Client Factory
//!
//! Builds streaming clients bound to a resolved provider endpoint. The
//! returned client exposes a single operation: `stream()`, a finite,
//! non-restartable sequence of generated text fragments decoded
//! incrementally from the provider's SSE response.
//!
//! Transport settings are fixed here: 10 seconds to connect, 60 seconds of
//! read inactivity before the stream fails with an upstream error. Sampling
//! parameters a compatibility mode does not support are dropped silently.

use std::pin::Pin;
use std::time::Duration;

use async_stream::try_stream;
use bytes::BytesMut;
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::config::SamplingDefaults;
use crate::error::ChatError;
use crate::providers::{CompatibilityMode, Provider};
use crate::schemas::ChatRequest;

/// Fully resolved sampling parameters: request value when present,
/// configured default otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: Option<u32>,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
}

impl SamplingParams {
    pub fn resolve(request: &ChatRequest, defaults: &SamplingDefaults) -> Self {
        Self {
            temperature: request.temperature.unwrap_or(defaults.temperature),
            top_p: request.top_p.unwrap_or(defaults.top_p),
            max_tokens: Some(request.max_tokens.unwrap_or(defaults.max_tokens)),
            presence_penalty: request.presence_penalty.unwrap_or(defaults.presence_penalty),
            frequency_penalty: request
                .frequency_penalty
                .unwrap_or(defaults.frequency_penalty),
        }
    }
}

/// A role-tagged message in provider wire format. Content is either a JSON
/// string or an array of multimodal parts, passed through untouched.
#[derive(Debug, Clone, Serialize)]
pub struct WireMessage {
    pub role: String,
    pub content: serde_json::Value,
}

/// Lazy sequence of generated text fragments. Finite; ends normally when
/// the provider signals completion and abnormally with `ChatError::Upstream`.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send>>;

/// Builds [`StreamingClient`]s sharing one pooled HTTP client.
#[derive(Clone)]
pub struct ModelClientFactory {
    http: reqwest::Client,
}

impl ModelClientFactory {
    pub fn new() -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .read_timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ChatError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// Bind a client to a provider endpoint with resolved sampling
    /// parameters.
    pub fn build(&self, provider: &Provider, model: &str, params: SamplingParams) -> StreamingClient {
        StreamingClient {
            http: self.http.clone(),
            base_url: provider.base_url.clone(),
            api_key: provider.api_key.clone(),
            mode: provider.compatibility_mode,
            model: model.to_string(),
            params,
        }
    }
}

/// A streaming chat client bound to one provider endpoint and one request's
/// sampling parameters.
pub struct StreamingClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    mode: CompatibilityMode,
    model: String,
    params: SamplingParams,
}

impl StreamingClient {
    fn request_body(&self, messages: &[WireMessage]) -> serde_json::Value {
        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "stream": true,
            "temperature": self.params.temperature,
            "top_p": self.params.top_p,
        });
        if self.mode.supports_penalties() {
            body["presence_penalty"] = json!(self.params.presence_penalty);
            body["frequency_penalty"] = json!(self.params.frequency_penalty);
        }
        if let Some(max_tokens) = self.params.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        body
    }

    /// Open the token stream. Consumes the client: the sequence is not
    /// restartable.
    pub async fn stream(self, messages: Vec<WireMessage>) -> Result<ChunkStream, ChatError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!(model = %self.model, %url, "opening token stream");

        let mut request = self.http.post(&url).json(&self.request_body(&messages));
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Upstream(format!("HTTP {status}: {body}")));
        }

        let mut bytes = response.bytes_stream();
        let stream = try_stream! {
            let mut buf = BytesMut::new();
            let mut done = false;
            while !done {
                let Some(chunk) = bytes.next().await else { break };
                let chunk = chunk
                    .map_err(|e| ChatError::Upstream(format!("stream interrupted: {e}")))?;
                buf.extend_from_slice(&chunk);
                while let Some((pos, sep_len)) = frame_boundary(&buf) {
                    let frame = buf.split_to(pos + sep_len);
                    match decode_frame(&frame) {
                        FramePayload::Done => {
                            done = true;
                            break;
                        }
                        FramePayload::Token(text) => yield text,
                        FramePayload::Skip => {}
                    }
                }
            }
            // a provider may end the body without a trailing blank line
            if !done && !buf.is_empty() {
                if let FramePayload::Token(text) = decode_frame(&buf) {
                    yield text;
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

enum FramePayload {
    /// The `[DONE]` sentinel.
    Done,
    /// A non-empty content delta.
    Token(String),
    /// Anything else: comments, role-only deltas, keep-alives.
    Skip,
}

/// Position and length of the first SSE frame separator (`\n\n` or
/// `\r\n\r\n`) in `buf`.
fn frame_boundary(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = buf.windows(2).position(|w| w == b"\n\n");
    let crlf = buf.windows(4).position(|w| w == b"\r\n\r\n");
    match (lf, crlf) {
        (Some(a), Some(b)) if b < a => Some((b, 4)),
        (Some(a), _) => Some((a, 2)),
        (None, Some(b)) => Some((b, 4)),
        (None, None) => None,
    }
}

fn decode_frame(frame: &[u8]) -> FramePayload {
    let text = String::from_utf8_lossy(frame);
    let Some(data) = text
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("data:"))
    else {
        return FramePayload::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return FramePayload::Done;
    }
    match serde_json::from_str::<serde_json::Value>(data) {
        Ok(value) => {
            let delta = value
                .get("choices")
                .and_then(|c| c.get(0))
                .and_then(|c| c.get("delta"))
                .and_then(|d| d.get("content"))
                .and_then(|c| c.as_str())
                .unwrap_or("");
            if delta.is_empty() {
                FramePayload::Skip
            } else {
                FramePayload::Token(delta.to_string())
            }
        }
        Err(_) => FramePayload::Skip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_json(content: &str) -> String {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion.chunk",
            "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": null}]
        })
        .to_string()
    }

    #[test]
    fn finds_lf_and_crlf_boundaries() {
        assert_eq!(frame_boundary(b"data: x\n\nrest"), Some((7, 2)));
        assert_eq!(frame_boundary(b"data: x\r\n\r\nrest"), Some((7, 4)));
        assert_eq!(frame_boundary(b"data: x"), None);
    }

    #[test]
    fn decodes_content_deltas() {
        let frame = format!("data: {}\n\n", chunk_json("Hi"));
        match decode_frame(frame.as_bytes()) {
            FramePayload::Token(text) => assert_eq!(text, "Hi"),
            _ => panic!("expected a token"),
        }
    }

    #[test]
    fn done_sentinel_and_noise_are_recognized() {
        assert!(matches!(decode_frame(b"data: [DONE]\n\n"), FramePayload::Done));
        assert!(matches!(decode_frame(b": keep-alive\n\n"), FramePayload::Skip));
        assert!(matches!(
            decode_frame(format!("data: {}\n\n", chunk_json("")).as_bytes()),
            FramePayload::Skip
        ));
    }

    #[test]
    fn request_values_override_defaults() {
        let request: ChatRequest = serde_json::from_value(json!({
            "provider": "demo",
            "model": "m1",
            "messages": [],
            "temperature": 0.1,
            "max_tokens": 32
        }))
        .unwrap();
        let params = SamplingParams::resolve(&request, &SamplingDefaults::default());
        assert_eq!(params.temperature, 0.1);
        assert_eq!(params.max_tokens, Some(32));
        assert_eq!(params.top_p, 1.0);
        assert_eq!(params.presence_penalty, 0.0);
    }

    #[test]
    fn body_carries_sampling_controls() {
        let factory = ModelClientFactory::new().unwrap();
        let provider = Provider {
            name: "demo".into(),
            display_name: "Demo".into(),
            base_url: "http://localhost:9/v1".into(),
            api_key: String::new(),
            default_model: "m1".into(),
            compatibility_mode: CompatibilityMode::OpenaiCompatible,
            icon: "settings".into(),
            is_custom: false,
            models: vec![],
        };
        let client = factory.build(
            &provider,
            "m1",
            SamplingParams {
                temperature: 0.3,
                top_p: 0.9,
                max_tokens: Some(128),
                presence_penalty: 0.5,
                frequency_penalty: -0.5,
            },
        );
        let body = client.request_body(&[WireMessage {
            role: "user".into(),
            content: json!("hello"),
        }]);
        assert_eq!(body["stream"], json!(true));
        assert_eq!(body["max_tokens"], json!(128));
        assert_eq!(body["presence_penalty"], json!(0.5));
        assert_eq!(body["messages"][0]["content"], json!("hello"));
    }
}
