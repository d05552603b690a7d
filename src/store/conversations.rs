//! Conversation and message operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{new_id, now_iso, Conversation, ConversationDetail, ConversationSummary, Store, StoredMessage};
use crate::error::ChatError;

fn row_to_message(row: &Row<'_>) -> Result<StoredMessage, rusqlite::Error> {
    Ok(StoredMessage {
        id: row.get("id")?,
        conversation_id: row.get("conversation_id")?,
        role: row.get("role")?,
        content: row.get("content")?,
        provider: row.get("provider")?,
        model: row.get("model")?,
        created_at: row.get("created_at")?,
    })
}

impl Store {
    /// Create a new conversation row.
    pub async fn create_conversation(
        &self,
        title: String,
        system_prompt: Option<String>,
    ) -> Result<Conversation, ChatError> {
        self.call(move |conn| {
            let id = new_id();
            let now = now_iso();
            conn.execute(
                "INSERT INTO conversations (id, title, system_prompt, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![id, title, system_prompt, now],
            )?;
            Ok(Conversation {
                id,
                title,
                system_prompt,
                created_at: now.clone(),
                updated_at: now,
            })
        })
        .await
    }

    /// All conversations, most recently updated first, with a preview of
    /// the last message and a message count.
    pub async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, ChatError> {
        self.call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.title, c.system_prompt, c.created_at, c.updated_at,
                        (SELECT content FROM messages
                          WHERE conversation_id = c.id
                          ORDER BY created_at DESC LIMIT 1) AS preview,
                        (SELECT COUNT(*) FROM messages
                          WHERE conversation_id = c.id) AS message_count
                 FROM conversations c
                 ORDER BY c.updated_at DESC",
            )?;
            let rows = stmt.query_map([], |row| {
                let preview: Option<String> = row.get("preview")?;
                Ok(ConversationSummary {
                    id: row.get("id")?,
                    title: row.get("title")?,
                    system_prompt: row.get("system_prompt")?,
                    created_at: row.get("created_at")?,
                    updated_at: row.get("updated_at")?,
                    preview: preview
                        .map(|p| p.chars().take(100).collect())
                        .unwrap_or_default(),
                    message_count: row.get("message_count")?,
                })
            })?;
            rows.collect()
        })
        .await
    }

    /// One conversation with its messages in creation order, or `None`.
    pub async fn get_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationDetail>, ChatError> {
        let conversation_id = conversation_id.to_string();
        self.call(move |conn| {
            let conversation = conn
                .query_row(
                    "SELECT id, title, system_prompt, created_at, updated_at
                     FROM conversations WHERE id = ?1",
                    params![conversation_id],
                    |row| {
                        Ok((
                            row.get::<_, String>("id")?,
                            row.get::<_, String>("title")?,
                            row.get::<_, Option<String>>("system_prompt")?,
                            row.get::<_, String>("created_at")?,
                            row.get::<_, String>("updated_at")?,
                        ))
                    },
                )
                .optional()?;

            let Some((id, title, system_prompt, created_at, updated_at)) = conversation else {
                return Ok(None);
            };

            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, role, content, provider, model, created_at
                 FROM messages WHERE conversation_id = ?1 ORDER BY created_at ASC",
            )?;
            let messages = stmt
                .query_map(params![id], row_to_message)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Some(ConversationDetail {
                id,
                title,
                system_prompt,
                created_at,
                updated_at,
                messages,
            }))
        })
        .await
    }

    /// Update title and/or system prompt. Returns false when the
    /// conversation does not exist or no field was given.
    pub async fn update_conversation(
        &self,
        conversation_id: &str,
        title: Option<String>,
        system_prompt: Option<String>,
    ) -> Result<bool, ChatError> {
        let conversation_id = conversation_id.to_string();
        self.call(move |conn| {
            let mut updates: Vec<&str> = Vec::new();
            let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
            if let Some(title) = title {
                updates.push("title = ?");
                values.push(Box::new(title));
            }
            if let Some(system_prompt) = system_prompt {
                updates.push("system_prompt = ?");
                values.push(Box::new(system_prompt));
            }
            if updates.is_empty() {
                return Ok(false);
            }
            updates.push("updated_at = ?");
            values.push(Box::new(now_iso()));
            values.push(Box::new(conversation_id));

            let sql = format!(
                "UPDATE conversations SET {} WHERE id = ?",
                updates.join(", ")
            );
            let changed = conn.execute(
                &sql,
                rusqlite::params_from_iter(values.iter().map(|v| v.as_ref())),
            )?;
            Ok(changed > 0)
        })
        .await
    }

    /// Delete a conversation and, via FK cascade, its messages.
    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<bool, ChatError> {
        let conversation_id = conversation_id.to_string();
        self.call(move |conn| {
            let changed = conn.execute(
                "DELETE FROM conversations WHERE id = ?1",
                params![conversation_id],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    /// Append a message and bump the conversation's `updated_at` in one
    /// transaction.
    pub async fn append_message(
        &self,
        conversation_id: &str,
        role: &str,
        content: String,
        provider: Option<String>,
        model: Option<String>,
    ) -> Result<StoredMessage, ChatError> {
        let conversation_id = conversation_id.to_string();
        let role = role.to_string();
        self.call(move |conn| {
            let id = new_id();
            let now = now_iso();
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages (id, conversation_id, role, content, provider, model, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![id, conversation_id, role, content, provider, model, now],
            )?;
            tx.execute(
                "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
                params![now, conversation_id],
            )?;
            tx.commit()?;
            Ok(StoredMessage {
                id,
                conversation_id,
                role,
                content,
                provider,
                model,
                created_at: now,
            })
        })
        .await
    }
}
