//! Prompt library operations.

use rusqlite::{params, Row};

use super::{new_id, now_iso, Prompt, Store};
use crate::error::ChatError;
use crate::schemas::{PromptCreate, PromptUpdate};

fn row_to_prompt(row: &Row<'_>) -> Result<Prompt, rusqlite::Error> {
    let tags_json: String = row.get("tags")?;
    Ok(Prompt {
        id: row.get("id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        category: row.get("category")?,
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        is_favorite: row.get::<_, i64>("is_favorite")? != 0,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

impl Store {
    pub async fn create_prompt(&self, input: PromptCreate) -> Result<Prompt, ChatError> {
        self.call(move |conn| {
            let id = new_id();
            let now = now_iso();
            let tags_json = serde_json::to_string(&input.tags).unwrap_or_else(|_| "[]".into());
            conn.execute(
                "INSERT INTO prompts (id, title, content, category, tags, is_favorite, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![id, input.title, input.content, input.category, tags_json, input.is_favorite as i64, now],
            )?;
            Ok(Prompt {
                id,
                title: input.title,
                content: input.content,
                category: input.category,
                tags: input.tags,
                is_favorite: input.is_favorite,
                created_at: now.clone(),
                updated_at: now,
            })
        })
        .await
    }

    /// All saved prompts, most recently updated first.
    pub async fn list_prompts(&self) -> Result<Vec<Prompt>, ChatError> {
        self.call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, content, category, tags, is_favorite, created_at, updated_at
                 FROM prompts ORDER BY updated_at DESC",
            )?;
            let rows = stmt.query_map([], row_to_prompt)?;
            rows.collect()
        })
        .await
    }

    /// Partial update. Returns false when the prompt does not exist or no
    /// field was given.
    pub async fn update_prompt(
        &self,
        prompt_id: &str,
        update: PromptUpdate,
    ) -> Result<bool, ChatError> {
        let prompt_id = prompt_id.to_string();
        self.call(move |conn| {
            let mut updates: Vec<&str> = Vec::new();
            let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
            if let Some(title) = update.title {
                updates.push("title = ?");
                values.push(Box::new(title));
            }
            if let Some(content) = update.content {
                updates.push("content = ?");
                values.push(Box::new(content));
            }
            if let Some(category) = update.category {
                updates.push("category = ?");
                values.push(Box::new(category));
            }
            if let Some(tags) = update.tags {
                updates.push("tags = ?");
                values.push(Box::new(
                    serde_json::to_string(&tags).unwrap_or_else(|_| "[]".into()),
                ));
            }
            if let Some(is_favorite) = update.is_favorite {
                updates.push("is_favorite = ?");
                values.push(Box::new(is_favorite as i64));
            }
            if updates.is_empty() {
                return Ok(false);
            }
            updates.push("updated_at = ?");
            values.push(Box::new(now_iso()));
            values.push(Box::new(prompt_id));

            let sql = format!("UPDATE prompts SET {} WHERE id = ?", updates.join(", "));
            let changed = conn.execute(
                &sql,
                rusqlite::params_from_iter(values.iter().map(|v| v.as_ref())),
            )?;
            Ok(changed > 0)
        })
        .await
    }

    pub async fn delete_prompt(&self, prompt_id: &str) -> Result<bool, ChatError> {
        let prompt_id = prompt_id.to_string();
        self.call(move |conn| {
            let changed = conn.execute("DELETE FROM prompts WHERE id = ?1", params![prompt_id])?;
            Ok(changed > 0)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::temp_store;
    use crate::schemas::{PromptCreate, PromptUpdate};

    #[tokio::test]
    async fn prompt_crud_round_trip() {
        let store = temp_store().await;
        let created = store
            .create_prompt(PromptCreate {
                title: "Reviewer".into(),
                content: "You review Rust code.".into(),
                category: "Coding".into(),
                tags: vec!["rust".into(), "review".into()],
                is_favorite: false,
            })
            .await
            .unwrap();

        let listed = store.list_prompts().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].tags, vec!["rust", "review"]);

        let updated = store
            .update_prompt(
                &created.id,
                PromptUpdate {
                    title: None,
                    content: None,
                    category: None,
                    tags: None,
                    is_favorite: Some(true),
                },
            )
            .await
            .unwrap();
        assert!(updated);
        assert!(store.list_prompts().await.unwrap()[0].is_favorite);

        assert!(store.delete_prompt(&created.id).await.unwrap());
        assert!(!store.delete_prompt(&created.id).await.unwrap());
    }

    #[tokio::test]
    async fn empty_update_reports_not_modified() {
        let store = temp_store().await;
        let modified = store
            .update_prompt(
                "missing",
                PromptUpdate {
                    title: None,
                    content: None,
                    category: None,
                    tags: None,
                    is_favorite: None,
                },
            )
            .await
            .unwrap();
        assert!(!modified);
    }
}
