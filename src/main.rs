//! Code Debug Chat - conversational helper for explaining and fixing code
//!
//! Wraps a hosted chat-completion model behind an HTTP/SSE chat surface
//! with a fixed debugging-assistant instruction.

mod api;
mod config;
mod history;
mod llm;
mod prompt;
mod samples;
mod session;
mod state_machine;

use api::{create_router, AppState};
use config::{AppConfig, HistoryScope};
use llm::{ChatCompletionsClient, InferenceClient, LoggingClient, API_KEY_ENV_VAR};
use session::{SessionRegistry, SessionSettings};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "code_debug_chat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = AppConfig::from_env();

    if config.api_key.is_none() {
        tracing::warn!(
            env_var = API_KEY_ENV_VAR,
            "{}",
            llm::missing_credential_message()
        );
    }

    // Inference client
    let client = ChatCompletionsClient::new(
        config.api_key.clone(),
        config.endpoint.clone(),
        config.generation.model.clone(),
        config.timeout,
    )?;
    let client: Arc<dyn InferenceClient> = Arc::new(LoggingClient::new(Arc::new(client)));

    tracing::info!(
        model = %client.model_id(),
        endpoint = %config.endpoint,
        streaming = config.streaming,
        "Inference client initialized"
    );
    if config.history_scope == HistoryScope::Shared {
        tracing::warn!(
            "Chat history is shared by every client of this process. \
             Set CHAT_HISTORY_SCOPE=session for one history per session."
        );
    }

    // Create application state
    let sessions = SessionRegistry::new(
        config.history_scope,
        client,
        SessionSettings {
            params: config.generation.clone(),
            streaming: config.streaming,
        },
    )
    .with_limits(config.max_sessions, config.session_idle);
    let state = AppState::new(sessions);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Code Debug Chat listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
