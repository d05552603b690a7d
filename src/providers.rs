//! # Provider Registry
//!
//! Merges the static provider table from configuration with user-defined
//! providers held in the store. By-name lookup returns everything needed to
//! talk to a provider: base URL, key, default model, and compatibility mode.
//!
//! The registry is a read-only view: mutation goes through the store's
//! custom-provider surface, and the next lookup observes it. No network
//! calls happen here.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::SharedConfig;
use crate::error::ChatError;
use crate::store::Store;

/// How a provider's API is shaped. Everything this backend talks to today
/// is OpenAI-compatible; the enum leaves room for other wire dialects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompatibilityMode {
    #[default]
    OpenaiCompatible,
}

impl CompatibilityMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompatibilityMode::OpenaiCompatible => "openai_compatible",
        }
    }

    /// Parse a stored mode string; unknown values fall back to the
    /// OpenAI-compatible dialect rather than failing a lookup.
    pub fn from_stored(value: &str) -> Self {
        match value {
            "openai_compatible" => CompatibilityMode::OpenaiCompatible,
            _ => CompatibilityMode::OpenaiCompatible,
        }
    }

    /// Whether this dialect accepts the penalty sampling controls. Modes
    /// that do not get them silently dropped, never a request failure.
    pub fn supports_penalties(&self) -> bool {
        match self {
            CompatibilityMode::OpenaiCompatible => true,
        }
    }
}

/// A fully resolved provider, from either the configuration table or the
/// custom-provider store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    /// Unique key across the merged static+custom sets.
    pub name: String,
    pub display_name: String,
    pub base_url: String,
    pub api_key: String,
    pub default_model: String,
    #[serde(default)]
    pub compatibility_mode: CompatibilityMode,
    pub icon: String,
    pub is_custom: bool,
    #[serde(default)]
    pub models: Vec<String>,
}

impl Provider {
    /// A copy with the API key masked for display.
    pub fn masked(&self) -> Provider {
        let mut masked = self.clone();
        masked.api_key = mask_api_key(&self.api_key);
        masked
    }
}

/// Local-backend placeholder keys that are not secrets and pass through
/// unmasked.
const UNMASKED_KEYS: [&str; 3] = ["ollama", "lm-studio", "vllm"];

/// Mask an API key for display: long keys keep their first 8 and last 4
/// characters, shorter non-empty keys become a fixed-width placeholder.
pub fn mask_api_key(key: &str) -> String {
    if key.is_empty() || UNMASKED_KEYS.contains(&key) {
        return key.to_string();
    }
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 12 {
        let head: String = chars[..8].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        let fill = "•".repeat(chars.len() - 12);
        format!("{head}{fill}{tail}")
    } else {
        "••••••••".to_string()
    }
}

/// Read-only merged view over the static configuration table and the
/// persisted custom providers. Custom wins on name collision.
#[derive(Clone)]
pub struct ProviderRegistry {
    config: SharedConfig,
    store: Store,
}

impl ProviderRegistry {
    pub fn new(config: SharedConfig, store: Store) -> Self {
        Self { config, store }
    }

    /// All providers, configuration order first, custom rows appended (or
    /// replacing a static entry of the same name, in place).
    pub async fn list_all(&self) -> Result<IndexMap<String, Provider>, ChatError> {
        let snapshot = self.config.snapshot();
        let mut merged: IndexMap<String, Provider> = snapshot
            .llm_providers
            .iter()
            .map(|(name, entry)| {
                (
                    name.clone(),
                    Provider {
                        name: name.clone(),
                        display_name: entry
                            .display_name
                            .clone()
                            .unwrap_or_else(|| name.clone()),
                        base_url: entry.base_url.clone(),
                        api_key: entry.api_key.clone(),
                        default_model: entry.default_model.clone(),
                        compatibility_mode: entry.compatibility_mode,
                        icon: entry.icon.clone().unwrap_or_else(|| "settings".to_string()),
                        is_custom: false,
                        models: entry.models.clone(),
                    },
                )
            })
            .collect();

        for provider in self.store.list_custom_providers().await? {
            merged.insert(provider.name.clone(), provider);
        }

        Ok(merged)
    }

    /// By-name lookup against the merged view.
    pub async fn resolve(&self, name: &str) -> Result<Option<Provider>, ChatError> {
        Ok(self.list_all().await?.shift_remove(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_long_keys_keeping_ends() {
        let masked = mask_api_key("sk-or-v1-0123456789abcdef");
        assert!(masked.starts_with("sk-or-v1"));
        assert!(masked.ends_with("cdef"));
        assert!(masked.contains('•'));
        assert_eq!(masked.chars().count(), "sk-or-v1-0123456789abcdef".len());
    }

    #[test]
    fn masks_short_keys_fully() {
        assert_eq!(mask_api_key("shortkey"), "••••••••");
    }

    #[test]
    fn local_backend_keys_pass_through() {
        assert_eq!(mask_api_key("ollama"), "ollama");
        assert_eq!(mask_api_key("lm-studio"), "lm-studio");
        assert_eq!(mask_api_key(""), "");
    }

    #[test]
    fn compatibility_mode_round_trips() {
        let mode = CompatibilityMode::OpenaiCompatible;
        assert_eq!(CompatibilityMode::from_stored(mode.as_str()), mode);
        assert_eq!(
            CompatibilityMode::from_stored("something_else"),
            CompatibilityMode::OpenaiCompatible
        );
    }
}
