//! Proverbs agent
//!
//! An HTTP service that runs a tool-using chat agent over a conversation,
//! plus speech transcription and synthesis endpoints.

mod agent;
mod api;
mod config;
mod llm;
mod speech;
mod system_prompt;
mod tools;

use agent::AgentConfig;
use api::{create_router, AppState};
use config::ServerConfig;
use llm::{LlmConfig, ModelRegistry};
use speech::SpeechConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tools::ToolRegistry;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Before logging, so RUST_LOG may come from .env
    let dotenv = config::load_dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "proverbs_agent=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false),
        )
        .init();

    config::log_dotenv(&dotenv);

    // Configuration
    let server_config = ServerConfig::from_env();
    let llm_config = LlmConfig::from_env();
    let agent_config = AgentConfig::from_env();
    let speech_config = SpeechConfig::from_env();

    // Initialize LLM registry
    let llm_registry = Arc::new(ModelRegistry::new(&llm_config));
    if llm_registry.has_models() {
        tracing::info!(
            models = ?llm_registry.available_models(),
            default = %llm_registry.default_model_id(),
            "LLM registry initialized"
        );
    } else {
        tracing::warn!(
            missing = ?ModelRegistry::missing_key_vars(&llm_config),
            "No LLM API keys configured; /api/chat will answer 503"
        );
    }

    let tools = Arc::new(ToolRegistry::standard());
    tracing::info!(
        tools = ?tools.names(),
        max_iterations = agent_config.max_iterations,
        unknown_tools = %agent_config.unknown_tools,
        native_tools = agent_config.native_tools,
        "Agent configured"
    );

    let mut state = AppState::new(
        llm_registry,
        tools,
        agent_config,
        llm_config.request_timeout,
    );
    match speech_config.build() {
        Ok(Some(speech)) => state = state.with_speech(speech),
        Ok(None) => tracing::warn!("OPENAI_API_KEY not set; speech endpoints disabled"),
        Err(e) => tracing::error!(error = %e, "Failed to create speech service"),
    }

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new().gzip(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], server_config.port));
    tracing::info!("Proverbs agent listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
