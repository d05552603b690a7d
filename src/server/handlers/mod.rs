//! HTTP handlers, grouped by resource.

pub mod admin;
pub mod chat;
pub mod conversations;
pub mod prompts;
pub mod providers;
