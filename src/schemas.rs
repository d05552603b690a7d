//! # Schemas Module
//!
//! Wire-level data structures for the chat endpoint and the CRUD surfaces
//! (conversations, prompts, providers). Range validation of sampling
//! parameters happens here, at the boundary, before the orchestrator runs.

use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// Message content: either plain text or an ordered sequence of multimodal
/// content parts. Parts are kept as raw JSON objects and passed through to
/// the provider untouched.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<serde_json::Value>),
}

impl MessageContent {
    /// Best-effort plain-text view, used for conversation titles. For
    /// multimodal content the `text` fields of the parts are concatenated.
    pub fn as_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    /// The form persisted in the store: text verbatim, parts as JSON.
    pub fn to_stored(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => {
                serde_json::to_string(parts).unwrap_or_default()
            }
        }
    }

    /// The form sent to the provider.
    pub fn to_wire(&self) -> serde_json::Value {
        match self {
            MessageContent::Text(text) => serde_json::Value::String(text.clone()),
            MessageContent::Parts(parts) => serde_json::Value::Array(parts.clone()),
        }
    }
}

/// A single role-tagged message in a chat request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatMessage {
    /// Message role: "system", "user", or "assistant".
    pub role: String,
    pub content: MessageContent,
}

/// Request body for the streaming chat endpoint. Transient, never persisted
/// as-is; the orchestrator persists the last user message and the assistant
/// reply separately.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// Provider name, resolved against the merged registry.
    pub provider: String,
    /// Model identifier, passed to the provider verbatim.
    pub model: String,
    /// Conversation messages in order.
    pub messages: Vec<ChatMessage>,
    /// Optional system prompt prepended to the message sequence.
    pub system_prompt: Option<String>,
    /// Existing conversation id. A new conversation is created when absent.
    pub conversation_id: Option<String>,
    /// Sampling temperature, 0.0 to 2.0.
    pub temperature: Option<f32>,
    /// Nucleus sampling, 0.0 to 1.0.
    pub top_p: Option<f32>,
    /// Maximum output tokens, 1 to 128000.
    pub max_tokens: Option<u32>,
    /// Presence penalty, -2.0 to 2.0.
    pub presence_penalty: Option<f32>,
    /// Frequency penalty, -2.0 to 2.0.
    pub frequency_penalty: Option<f32>,
}

impl ChatRequest {
    /// Range-validate the sampling parameters. Out-of-range values are
    /// rejected with HTTP 400 before any side effect.
    pub fn validate(&self) -> Result<(), ChatError> {
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ChatError::Validation(format!(
                    "temperature must be between 0.0 and 2.0, got {t}"
                )));
            }
        }
        if let Some(p) = self.top_p {
            if !(0.0..=1.0).contains(&p) {
                return Err(ChatError::Validation(format!(
                    "top_p must be between 0.0 and 1.0, got {p}"
                )));
            }
        }
        if let Some(m) = self.max_tokens {
            if !(1..=128_000).contains(&m) {
                return Err(ChatError::Validation(format!(
                    "max_tokens must be between 1 and 128000, got {m}"
                )));
            }
        }
        for (name, value) in [
            ("presence_penalty", self.presence_penalty),
            ("frequency_penalty", self.frequency_penalty),
        ] {
            if let Some(v) = value {
                if !(-2.0..=2.0).contains(&v) {
                    return Err(ChatError::Validation(format!(
                        "{name} must be between -2.0 and 2.0, got {v}"
                    )));
                }
            }
        }
        Ok(())
    }
}

// --- Conversation payloads ---

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationCreate {
    pub title: Option<String>,
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationUpdate {
    pub title: Option<String>,
    pub system_prompt: Option<String>,
}

// --- Prompt library payloads ---

#[derive(Debug, Clone, Deserialize)]
pub struct PromptCreate {
    pub title: String,
    pub content: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_favorite: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromptUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_favorite: Option<bool>,
}

fn default_category() -> String {
    "General".to_string()
}

// --- Provider administration payloads ---

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderCreate {
    pub name: String,
    pub display_name: String,
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub default_model: String,
    #[serde(default)]
    pub compatibility_mode: crate::providers::CompatibilityMode,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default)]
    pub models: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderUpdate {
    pub display_name: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub default_model: Option<String>,
    pub icon: Option<String>,
}

fn default_icon() -> String {
    "settings".to_string()
}

/// Result of probing a provider with a minimal completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderTestResult {
    pub success: bool,
    pub message: String,
    pub response_time_ms: Option<f64>,
}
