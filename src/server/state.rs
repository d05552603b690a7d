//! Shared application state, one instance per process, cloned per request.

use std::time::Duration;

use crate::client::ModelClientFactory;
use crate::config::{Settings, SharedConfig};
use crate::error::ChatError;
use crate::providers::ProviderRegistry;
use crate::store::Store;

/// Everything a handler needs. All members are cheap to clone: the config
/// is an `Arc` snapshot holder, the store a path handle, the HTTP clients
/// share their connection pools.
#[derive(Clone)]
pub struct AppState {
    pub config: SharedConfig,
    pub store: Store,
    pub registry: ProviderRegistry,
    /// Streaming clients for chat completions (long read timeout).
    pub model_clients: ModelClientFactory,
    /// Short-timeout client for discovery and probes.
    pub http_client: reqwest::Client,
}

impl AppState {
    /// Build state from process settings: load the YAML configuration and
    /// open the database.
    pub async fn new(settings: &Settings) -> Result<Self, ChatError> {
        let config = SharedConfig::load(&settings.config_path)?;
        let store = Store::open(&settings.database_path).await?;
        Self::from_parts(config, store)
    }

    /// Assemble state from already-built configuration and store. Used by
    /// tests to wire in an in-memory config and a temp database.
    pub fn from_parts(config: SharedConfig, store: Store) -> Result<Self, ChatError> {
        let registry = ProviderRegistry::new(config.clone(), store.clone());
        let model_clients = ModelClientFactory::new()?;
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ChatError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            config,
            store,
            registry,
            model_clients,
            http_client,
        })
    }
}
