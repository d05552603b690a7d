//! # OmniChatLLM (ocLLM)
//!
//! A backend for conversing with any OpenAI-compatible LLM provider. One
//! streaming chat endpoint orchestrates provider resolution, conversation
//! persistence, and token-by-token SSE delivery; CRUD surfaces manage
//! conversations, a prompt library, and the provider table.
//!
//! ## Architecture
//!
//! - [`config`]: CLI/env settings plus the reloadable YAML provider table.
//! - [`providers`]: the merged static+custom provider registry.
//! - [`store`]: SQLite persistence (conversations, messages, prompts,
//!   custom providers).
//! - [`client`]: streaming clients for OpenAI-compatible endpoints.
//! - [`streaming`]: the per-request orchestrator and SSE event vocabulary.
//! - [`server`]: the axum router, handlers, and shared state.
//!
//! ## Quick start
//!
//! ```no_run
//! use omni_chat_llm::{config::Settings, server};
//!
//! #[tokio::main]
//! async fn main() -> omni_chat_llm::Result<()> {
//!     let settings = Settings::parse_args();
//!     let state = server::AppState::new(&settings).await?;
//!     let app = server::create_router(state);
//!     let listener =
//!         tokio::net::TcpListener::bind((settings.host.as_str(), settings.port)).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod providers;
pub mod schemas;
pub mod server;
pub mod store;
pub mod streaming;

pub use error::ChatError;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ChatError>;
