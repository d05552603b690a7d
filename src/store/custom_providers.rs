//! Custom provider rows. These overlay the static configuration table in
//! the registry; a custom row with the same name as a static provider wins.

use rusqlite::{params, Row};

use super::{now_iso, Store};
use crate::error::ChatError;
use crate::providers::{CompatibilityMode, Provider};

fn row_to_provider(row: &Row<'_>) -> Result<Provider, rusqlite::Error> {
    let mode: String = row.get("compatibility_mode")?;
    let models_json: String = row.get("models")?;
    Ok(Provider {
        name: row.get("name")?,
        display_name: row.get("display_name")?,
        base_url: row.get("base_url")?,
        api_key: row.get("api_key")?,
        default_model: row.get("default_model")?,
        compatibility_mode: CompatibilityMode::from_stored(&mode),
        icon: row.get("icon")?,
        is_custom: true,
        models: serde_json::from_str(&models_json).unwrap_or_default(),
    })
}

impl Store {
    /// Insert or replace a custom provider row. `created_at` of an
    /// existing row is preserved.
    pub async fn save_custom_provider(&self, provider: Provider) -> Result<(), ChatError> {
        self.call(move |conn| {
            let now = now_iso();
            let models_json =
                serde_json::to_string(&provider.models).unwrap_or_else(|_| "[]".into());
            conn.execute(
                "INSERT INTO custom_providers
                    (name, display_name, base_url, api_key, default_model,
                     compatibility_mode, icon, models, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
                 ON CONFLICT(name) DO UPDATE SET
                    display_name = excluded.display_name,
                    base_url = excluded.base_url,
                    api_key = excluded.api_key,
                    default_model = excluded.default_model,
                    compatibility_mode = excluded.compatibility_mode,
                    icon = excluded.icon,
                    models = excluded.models,
                    updated_at = excluded.updated_at",
                params![
                    provider.name,
                    provider.display_name,
                    provider.base_url,
                    provider.api_key,
                    provider.default_model,
                    provider.compatibility_mode.as_str(),
                    provider.icon,
                    models_json,
                    now
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// All custom providers, insertion order.
    pub async fn list_custom_providers(&self) -> Result<Vec<Provider>, ChatError> {
        self.call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name, display_name, base_url, api_key, default_model,
                        compatibility_mode, icon, models
                 FROM custom_providers ORDER BY created_at ASC",
            )?;
            let rows = stmt.query_map([], row_to_provider)?;
            rows.collect()
        })
        .await
    }

    /// Remove a custom provider row. Static providers cannot be deleted;
    /// returns false when no custom row matched.
    pub async fn delete_custom_provider(&self, name: &str) -> Result<bool, ChatError> {
        let name = name.to_string();
        self.call(move |conn| {
            let changed =
                conn.execute("DELETE FROM custom_providers WHERE name = ?1", params![name])?;
            Ok(changed > 0)
        })
        .await
    }
}
