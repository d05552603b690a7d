//! Stream event vocabulary for the chat SSE channel.
//!
//! Exactly four frame shapes leave the server, all JSON objects tagged by a
//! `type` field. Clients key on `conversation_id` to learn the conversation
//! they are in, accumulate `token` frames, and stop on the single terminal
//! frame (`done` or `error`).

use axum::response::sse::Event;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// First frame of a stream that created a new conversation, carrying
    /// the fresh conversation id. Not sent when the request already named
    /// a conversation.
    #[serde(rename = "conversation_id")]
    ConversationStarted { id: String },
    /// One generated text fragment, in order.
    Token { content: String },
    /// Terminal: the reply completed and was persisted.
    Done { conversation_id: String },
    /// Terminal: the stream failed. Whatever arrived before this frame was
    /// still persisted.
    Error { message: String },
}

impl StreamEvent {
    /// Whether this frame ends the stream. Exactly one terminal frame is
    /// emitted per stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done { .. } | StreamEvent::Error { .. })
    }

    /// The JSON payload of the SSE data line.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"type":"error","message":"event serialization failed"}"#.to_string()
        })
    }
}

impl From<StreamEvent> for Event {
    fn from(event: StreamEvent) -> Self {
        Event::default().data(event.to_json())
    }
}
