//! # Store Module
//!
//! SQLite persistence for conversations, messages, saved prompts, and
//! custom providers. Connections are opened per call on the blocking pool,
//! with WAL journaling and a 5 second busy timeout; concurrent requests
//! against different conversations never block each other beyond SQLite's
//! own write lock, and rare same-conversation writers are serialized by it.

mod conversations;
mod custom_providers;
mod prompts;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::ChatError;

/// Current UTC time in RFC 3339, the timestamp format of every table.
pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

/// New opaque row id (UUID v4, hex, no hyphens).
pub(crate) fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// A conversation row.
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub system_prompt: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A conversation row decorated for listing.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub system_prompt: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    /// Last message content, truncated to 100 characters.
    pub preview: String,
    pub message_count: i64,
}

/// A message row. Immutable once created, append-only per conversation.
#[derive(Debug, Clone, Serialize)]
pub struct StoredMessage {
    pub id: String,
    pub conversation_id: String,
    pub role: String,
    pub content: String,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub created_at: String,
}

/// A conversation with its messages in creation order.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationDetail {
    pub id: String,
    pub title: String,
    pub system_prompt: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub messages: Vec<StoredMessage>,
}

/// A saved prompt from the prompt library.
#[derive(Debug, Clone, Serialize)]
pub struct Prompt {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub is_favorite: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Handle to the SQLite database. Cloning is cheap; every operation opens
/// its own connection on the blocking pool.
#[derive(Clone)]
pub struct Store {
    path: Arc<PathBuf>,
}

impl Store {
    /// Open (creating if needed) the database at `path` and run migrations.
    pub async fn open(path: &Path) -> Result<Self, ChatError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let store = Self {
            path: Arc::new(path.to_path_buf()),
        };
        store.call(|conn| migrate(conn)).await?;
        info!("store ready at {}", path.display());
        Ok(store)
    }

    fn connect(&self) -> Result<Connection, rusqlite::Error> {
        let conn = Connection::open(&*self.path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(conn)
    }

    /// Run `f` with a fresh connection on the blocking pool.
    pub(crate) async fn call<T, F>(&self, f: F) -> Result<T, ChatError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, rusqlite::Error> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = store.connect()?;
            f(&mut conn)
        })
        .await?
        .map_err(ChatError::from)
    }
}

fn migrate(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode=WAL;

        CREATE TABLE IF NOT EXISTS conversations (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL DEFAULT 'New Chat',
            system_prompt TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            conversation_id TEXT NOT NULL,
            role TEXT NOT NULL,
            content TEXT NOT NULL,
            provider TEXT,
            model TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS prompts (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            category TEXT NOT NULL DEFAULT 'General',
            tags TEXT NOT NULL DEFAULT '[]',
            is_favorite INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS custom_providers (
            name TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            base_url TEXT NOT NULL,
            api_key TEXT NOT NULL DEFAULT '',
            default_model TEXT NOT NULL DEFAULT '',
            compatibility_mode TEXT NOT NULL DEFAULT 'openai_compatible',
            icon TEXT NOT NULL DEFAULT 'settings',
            models TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON messages(conversation_id);
        CREATE INDEX IF NOT EXISTS idx_prompts_category
            ON prompts(category);
        "#,
    )
}


#[cfg(test)]
mod tests {
    use super::test_support::temp_store;

    #[tokio::test]
    async fn cascade_delete_removes_messages() {
        let store = temp_store().await;
        let conv = store
            .create_conversation("hello".to_string(), None)
            .await
            .unwrap();
        store
            .append_message(&conv.id, "user", "hi".to_string(), None, None)
            .await
            .unwrap();
        store
            .append_message(&conv.id, "assistant", "hey".to_string(), Some("demo".into()), Some("m1".into()))
            .await
            .unwrap();

        assert!(store.delete_conversation(&conv.id).await.unwrap());
        assert!(store.get_conversation(&conv.id).await.unwrap().is_none());
        let summaries = store.list_conversations().await.unwrap();
        assert!(summaries.iter().all(|c| c.id != conv.id));
    }

    #[tokio::test]
    async fn append_bumps_conversation_updated_at() {
        let store = temp_store().await;
        let conv = store
            .create_conversation("t".to_string(), None)
            .await
            .unwrap();
        // RFC 3339 with sub-second precision; any later append must compare greater
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store
            .append_message(&conv.id, "user", "x".to_string(), None, None)
            .await
            .unwrap();
        let detail = store.get_conversation(&conv.id).await.unwrap().unwrap();
        assert!(detail.updated_at > conv.updated_at);
        assert_eq!(detail.messages.len(), 1);
    }
}
