//! Orchestration of one streaming chat exchange.
//!
//! The sequence is fixed: resolve the provider, ensure a conversation row,
//! persist the incoming user message, open the provider stream, forward
//! token frames, then persist the assistant reply (complete or partial)
//! and emit exactly one terminal frame. Client disconnect stops forwarding
//! but never skips persistence of what was already generated.

use futures_util::StreamExt;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, warn};

use crate::client::{ChunkStream, SamplingParams, WireMessage};
use crate::error::ChatError;
use crate::schemas::{ChatMessage, ChatRequest};
use crate::server::state::AppState;
use crate::store::Store;

use super::events::StreamEvent;

/// Longest derived conversation title, in characters, before truncation.
const TITLE_MAX_CHARS: usize = 50;

/// Ordered event channel with the stream's two invariants built in: at most
/// one terminal frame goes out, and a failed send marks the client as gone
/// instead of erroring.
pub(crate) struct EventSink {
    tx: UnboundedSender<StreamEvent>,
    terminated: bool,
    client_gone: bool,
}

impl EventSink {
    pub(crate) fn new(tx: UnboundedSender<StreamEvent>) -> Self {
        Self {
            tx,
            terminated: false,
            client_gone: false,
        }
    }

    pub(crate) fn emit(&mut self, event: StreamEvent) {
        if self.terminated {
            warn!("suppressed frame after terminal event");
            return;
        }
        if event.is_terminal() {
            self.terminated = true;
        }
        if self.tx.send(event).is_err() {
            self.client_gone = true;
        }
    }

    pub(crate) fn client_gone(&self) -> bool {
        self.client_gone
    }
}

/// Derive a conversation title from the first user message: up to 50
/// characters, with a `...` suffix when truncated. Falls back to "New Chat".
fn derive_title(messages: &[ChatMessage]) -> String {
    let text = messages
        .iter()
        .find(|m| m.role == "user")
        .map(|m| m.content.as_text())
        .unwrap_or_default();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return "New Chat".to_string();
    }
    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() > TITLE_MAX_CHARS {
        let head: String = chars[..TITLE_MAX_CHARS].iter().collect();
        format!("{head}...")
    } else {
        trimmed.to_string()
    }
}

/// Provider wire messages: the system prompt (when set) followed by the
/// request messages in order.
fn build_wire_messages(request: &ChatRequest) -> Vec<WireMessage> {
    let mut wire = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system_prompt) = request
        .system_prompt
        .as_deref()
        .filter(|p| !p.trim().is_empty())
    {
        wire.push(WireMessage {
            role: "system".to_string(),
            content: serde_json::Value::String(system_prompt.to_string()),
        });
    }
    for message in &request.messages {
        wire.push(WireMessage {
            role: message.role.clone(),
            content: message.content.to_wire(),
        });
    }
    wire
}

/// Run one chat exchange end to end, emitting frames into `tx`. Always
/// terminates the stream with exactly one `done` or `error` frame.
pub(crate) async fn run(state: AppState, request: ChatRequest, tx: UnboundedSender<StreamEvent>) {
    let mut sink = EventSink::new(tx);

    // 1. Provider resolution. Nothing is persisted on failure.
    let provider = match state.registry.resolve(&request.provider).await {
        Ok(Some(provider)) => provider,
        Ok(None) => {
            sink.emit(StreamEvent::Error {
                message: ChatError::ProviderNotFound(request.provider.clone()).to_string(),
            });
            return;
        }
        Err(e) => {
            error!("provider resolution failed: {e}");
            sink.emit(StreamEvent::Error { message: e.to_string() });
            return;
        }
    };

    // 2. Conversation: reuse the given id after checking it exists, or
    //    create a fresh row titled after the first user message. The
    //    conversation_id frame is only sent for conversations created here;
    //    a client that passed an id already knows it.
    let conversation_id = match &request.conversation_id {
        Some(id) => match state.store.get_conversation(id).await {
            Ok(Some(_)) => id.clone(),
            Ok(None) => {
                sink.emit(StreamEvent::Error {
                    message: ChatError::NotFound("Conversation").to_string(),
                });
                return;
            }
            Err(e) => {
                sink.emit(StreamEvent::Error { message: e.to_string() });
                return;
            }
        },
        None => {
            let title = derive_title(&request.messages);
            match state
                .store
                .create_conversation(title, request.system_prompt.clone())
                .await
            {
                Ok(conversation) => {
                    sink.emit(StreamEvent::ConversationStarted {
                        id: conversation.id.clone(),
                    });
                    conversation.id
                }
                Err(e) => {
                    sink.emit(StreamEvent::Error { message: e.to_string() });
                    return;
                }
            }
        }
    };

    // 3. Persist the incoming user message before any token is generated.
    if let Some(user_message) = request.messages.iter().rev().find(|m| m.role == "user") {
        if let Err(e) = state
            .store
            .append_message(
                &conversation_id,
                "user",
                user_message.content.to_stored(),
                None,
                None,
            )
            .await
        {
            sink.emit(StreamEvent::Error { message: e.to_string() });
            return;
        }
    }

    // 4. Open the provider stream.
    let params = SamplingParams::resolve(&request, &state.config.snapshot().defaults);
    let client = state.model_clients.build(&provider, &request.model, params);
    let chunks = match client.stream(build_wire_messages(&request)).await {
        Ok(chunks) => chunks,
        Err(e) => {
            warn!(provider = %provider.name, "stream open failed: {e}");
            sink.emit(StreamEvent::Error { message: e.to_string() });
            return;
        }
    };

    debug!(provider = %provider.name, model = %request.model, %conversation_id, "streaming");
    stream_and_finalize(
        &state.store,
        &conversation_id,
        &provider.name,
        &request.model,
        chunks,
        &mut sink,
    )
    .await;
}

/// Forward token frames and finalize: persist the assistant reply exactly
/// once, complete or partial or empty, then emit the terminal frame. A
/// persistence failure after streaming is logged, not surfaced; the client
/// already holds the tokens.
pub(crate) async fn stream_and_finalize(
    store: &Store,
    conversation_id: &str,
    provider: &str,
    model: &str,
    mut chunks: ChunkStream,
    sink: &mut EventSink,
) {
    let mut reply = String::new();
    let mut failure: Option<ChatError> = None;

    while let Some(item) = chunks.next().await {
        match item {
            Ok(text) => {
                reply.push_str(&text);
                sink.emit(StreamEvent::Token { content: text });
                if sink.client_gone() {
                    debug!(%conversation_id, "client disconnected, stopping stream");
                    break;
                }
            }
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    if let Err(e) = store
        .append_message(
            conversation_id,
            "assistant",
            reply,
            Some(provider.to_string()),
            Some(model.to_string()),
        )
        .await
    {
        error!(%conversation_id, "failed to persist assistant reply: {e}");
    }

    match failure {
        Some(e) => sink.emit(StreamEvent::Error { message: e.to_string() }),
        None => sink.emit(StreamEvent::Done {
            conversation_id: conversation_id.to_string(),
        }),
    }
}
