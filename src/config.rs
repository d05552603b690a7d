//! # Configuration
//!
//! Two layers, both explicit (no hidden globals):
//!
//! - [`Settings`]: process settings from CLI arguments and environment
//!   variables (with `.env` loading), parsed once at startup.
//! - [`SharedConfig`]: the YAML provider table plus sampling defaults,
//!   loaded once at startup and atomically swappable through `reload()`.
//!   Readers always take a cheap `Arc` snapshot; a single writer replaces
//!   the whole snapshot on reload.
//!
//! `${VAR}` references inside YAML string values are substituted from the
//! environment at load time. A reference to a variable that is not set
//! resolves to the literal sentinel `MISSING_<VAR>` instead of failing, so
//! misconfiguration surfaces at use time (an upstream auth error), not at
//! load time.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use clap::Parser;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::info;

use crate::error::ChatError;
use crate::providers::CompatibilityMode;

/// Process settings from CLI arguments and environment variables.
#[derive(Debug, Clone, Parser)]
#[command(name = "ocllm")]
#[command(about = "A backend for conversing with any OpenAI-compatible LLM provider, with streaming chat, conversation history, and a prompt library")]
#[command(version)]
pub struct Settings {
    /// Server port to listen on
    #[arg(short, long, env = "PORT", default_value = "8080")]
    pub port: u16,

    /// Server host to bind to
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Path to the YAML provider/defaults configuration file
    #[arg(long, env = "OCLLM_CONFIG", default_value = "config/global.yaml")]
    pub config_path: PathBuf,

    /// Path to the SQLite database file
    #[arg(long, env = "OCLLM_DB", default_value = "data/ocllm.db")]
    pub database_path: PathBuf,

    /// Log filter (error, warn, info, debug, trace or an EnvFilter spec)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

impl Settings {
    /// Parse settings, loading a `.env` file first when one exists.
    pub fn parse_args() -> Self {
        let _ = dotenv::dotenv();
        Self::parse()
    }
}

/// Default sampling parameters, used for every request field the client
/// leaves unset.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplingDefaults {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
}

impl Default for SamplingDefaults {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 1.0,
            max_tokens: 4096,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
        }
    }
}

/// One provider row of the YAML table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderEntry {
    pub display_name: Option<String>,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub default_model: String,
    #[serde(default)]
    pub compatibility_mode: CompatibilityMode,
    pub icon: Option<String>,
    #[serde(default)]
    pub models: Vec<String>,
}

/// The deserialized YAML configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    /// Static provider table, keyed by provider name. Order is preserved
    /// for display purposes.
    #[serde(default)]
    pub llm_providers: IndexMap<String, ProviderEntry>,
    #[serde(default)]
    pub defaults: SamplingDefaults,
}

static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{(\w+)\}").expect("valid env var pattern"));

/// Replace `${VAR}` placeholders in a string with environment values,
/// falling back to the `MISSING_<VAR>` sentinel.
fn substitute_env_vars(value: &str) -> String {
    ENV_VAR_PATTERN
        .replace_all(value, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            env::var(name).unwrap_or_else(|_| format!("MISSING_{name}"))
        })
        .into_owned()
}

/// Recursively substitute env vars in every string value of a YAML tree.
fn resolve_yaml(value: serde_yaml::Value) -> serde_yaml::Value {
    match value {
        serde_yaml::Value::String(s) => serde_yaml::Value::String(substitute_env_vars(&s)),
        serde_yaml::Value::Sequence(items) => {
            serde_yaml::Value::Sequence(items.into_iter().map(resolve_yaml).collect())
        }
        serde_yaml::Value::Mapping(map) => serde_yaml::Value::Mapping(
            map.into_iter().map(|(k, v)| (k, resolve_yaml(v))).collect(),
        ),
        other => other,
    }
}

fn load_file_config(path: &Path) -> Result<FileConfig, ChatError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        ChatError::Config(format!("cannot read {}: {e}", path.display()))
    })?;
    let value: serde_yaml::Value = serde_yaml::from_str(&raw)?;
    let config: FileConfig = serde_yaml::from_value(resolve_yaml(value))?;
    Ok(config)
}

/// Atomically swappable configuration snapshot. Cloning is cheap and every
/// clone observes reloads.
#[derive(Clone)]
pub struct SharedConfig {
    snapshot: Arc<RwLock<Arc<FileConfig>>>,
    path: Option<Arc<PathBuf>>,
}

impl SharedConfig {
    /// Load the YAML file at `path`. Fails when the file is missing or
    /// malformed; `${VAR}` resolution never fails.
    pub fn load(path: &Path) -> Result<Self, ChatError> {
        let config = load_file_config(path)?;
        info!(
            providers = config.llm_providers.len(),
            "configuration loaded from {}",
            path.display()
        );
        Ok(Self {
            snapshot: Arc::new(RwLock::new(Arc::new(config))),
            path: Some(Arc::new(path.to_path_buf())),
        })
    }

    /// Wrap an in-memory configuration; `reload()` is a no-op. Used by
    /// tests and embedders.
    pub fn from_value(config: FileConfig) -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(Arc::new(config))),
            path: None,
        }
    }

    /// The current snapshot. Callers must not cache it across requests.
    pub fn snapshot(&self) -> Arc<FileConfig> {
        self.snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Re-read the file and swap the snapshot in one step. In-flight
    /// readers keep the snapshot they already took.
    pub fn reload(&self) -> Result<(), ChatError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let fresh = load_file_config(path)?;
        info!(
            providers = fresh.llm_providers.len(),
            "configuration reloaded from {}",
            path.display()
        );
        let mut guard = self
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(fresh);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_env_vars() {
        env::set_var("OCLLM_TEST_KEY_A", "sk-abc123");
        assert_eq!(
            substitute_env_vars("Bearer ${OCLLM_TEST_KEY_A}"),
            "Bearer sk-abc123"
        );
    }

    #[test]
    fn missing_env_var_resolves_to_sentinel() {
        env::remove_var("OCLLM_TEST_KEY_DOES_NOT_EXIST");
        assert_eq!(
            substitute_env_vars("${OCLLM_TEST_KEY_DOES_NOT_EXIST}"),
            "MISSING_OCLLM_TEST_KEY_DOES_NOT_EXIST"
        );
    }

    #[test]
    fn parses_provider_table_with_defaults() {
        let yaml = r#"
llm_providers:
  openrouter:
    display_name: OpenRouter
    base_url: https://openrouter.ai/api/v1
    api_key: ${OCLLM_TEST_KEY_B}
    default_model: google/gemini-2.0-flash-exp:free
    models:
      - google/gemini-2.0-flash-exp:free
  local:
    display_name: Local Ollama
    base_url: http://localhost:11434/v1
    api_key: ollama
defaults:
  temperature: 0.5
"#;
        env::remove_var("OCLLM_TEST_KEY_B");
        let value: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
        let config: FileConfig = serde_yaml::from_value(resolve_yaml(value)).unwrap();

        assert_eq!(config.llm_providers.len(), 2);
        let openrouter = &config.llm_providers["openrouter"];
        assert_eq!(openrouter.api_key, "MISSING_OCLLM_TEST_KEY_B");
        assert_eq!(openrouter.models.len(), 1);
        // unspecified defaults fall back field by field
        assert_eq!(config.defaults.temperature, 0.5);
        assert_eq!(config.defaults.top_p, 1.0);
        assert_eq!(config.defaults.max_tokens, 4096);
    }

    #[test]
    fn reload_is_noop_for_in_memory_config() {
        let shared = SharedConfig::from_value(FileConfig::default());
        assert!(shared.reload().is_ok());
        assert!(shared.snapshot().llm_providers.is_empty());
    }
}
