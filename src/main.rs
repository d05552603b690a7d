//! ocLLM server binary.

use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use omni_chat_llm::config::Settings;
use omni_chat_llm::server::{create_router, AppState};

#[tokio::main]
async fn main() -> omni_chat_llm::Result<()> {
    let settings = Settings::parse_args();

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = AppState::new(&settings).await?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind((settings.host.as_str(), settings.port)).await?;
    info!("listening on {}:{}", settings.host, settings.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    info!("shutdown signal received");
}
