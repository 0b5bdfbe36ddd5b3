mod config;
mod errors;
mod llm_client;
mod pdf;
mod review;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Scholar Review API v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Default LLM endpoint: {} (model: {}, policy model: {})",
        config.llm_base_url, config.llm_model, config.policy_model
    );

    // Shared HTTP client for LLM calls and PDF fetches. No default timeout:
    // evaluation calls may stream for minutes. The PDF fetch path sets its
    // own 30s budget per request.
    let http = reqwest::Client::new();

    // Build app state
    let state = AppState {
        http,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // browser clients call this cross-origin

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
