//! # Streaming Module
//!
//! Turns one validated chat request into an SSE response. The orchestrator
//! runs on its own task and outlives the HTTP response: when the client
//! disconnects mid-stream, the task still persists whatever the provider
//! generated before the disconnect was observed.

pub mod events;
pub(crate) mod orchestrator;

use std::convert::Infallible;

use axum::http::{header, HeaderName, HeaderValue};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;

use crate::schemas::ChatRequest;
use crate::server::state::AppState;

pub use events::StreamEvent;

/// Start a chat exchange and return its SSE response. The request must be
/// validated before this point; every failure from here on is reported
/// in-stream as an `error` frame, not as an HTTP error.
pub fn chat_stream_response(state: AppState, request: ChatRequest) -> Response {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(orchestrator::run(state, request, tx));

    let frames =
        UnboundedReceiverStream::new(rx).map(|event| Ok::<Event, Infallible>(event.into()));

    let mut response = Sse::new(frames)
        .keep_alive(KeepAlive::default())
        .into_response();
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    // disable proxy buffering so tokens reach the client as they arrive
    headers.insert(
        HeaderName::from_static("x-accel-buffering"),
        HeaderValue::from_static("no"),
    );
    response
}
