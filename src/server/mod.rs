//! # Server Module
//!
//! The axum router and shared state. One route table, CORS open for local
//! frontend development, request tracing on every route.

pub mod handlers;
pub mod state;

use axum::routing::{get, post, put};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(handlers::chat::chat))
        .route(
            "/api/conversations",
            get(handlers::conversations::list).post(handlers::conversations::create),
        )
        .route(
            "/api/conversations/{id}",
            get(handlers::conversations::get)
                .patch(handlers::conversations::update)
                .delete(handlers::conversations::delete),
        )
        .route(
            "/api/prompts",
            get(handlers::prompts::list).post(handlers::prompts::create),
        )
        .route(
            "/api/prompts/{id}",
            put(handlers::prompts::update).delete(handlers::prompts::delete),
        )
        .route(
            "/api/providers",
            get(handlers::providers::list).post(handlers::providers::create),
        )
        .route(
            "/api/providers/{name}",
            put(handlers::providers::update).delete(handlers::providers::delete),
        )
        .route("/api/providers/{name}/models", get(handlers::providers::models))
        .route("/api/providers/{name}/test", post(handlers::providers::test))
        .route("/api/admin/config/reload", post(handlers::admin::reload_config))
        .route("/api/health", get(handlers::admin::health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
