mod config;
mod errors;
mod extraction;
mod generation;
mod llm_client;
mod models;
mod relay;
mod routes;
mod state;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::routes::build_app;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed numeric env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting RedNote caption API v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Server keys: gemini={} deepseek={}",
        config.gemini_api_key.is_some(),
        config.deepseek_api_key.is_some()
    );
    match &config.relay_url {
        Some(url) => info!("Keyless requests relay through {url}"),
        None => info!("No relay configured; requests without a key use the server keys"),
    }
    if config.gemini_api_key.is_none() && config.relay_url.is_none() {
        warn!("No GEMINI_API_KEY and no RELAY_URL: generation needs a user-supplied key");
    }

    // Build app state and router
    let state = AppState::new(config.clone())?;
    let app = build_app(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
