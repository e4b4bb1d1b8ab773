//! Search proxy server
//!
//! Exposes the upstream search to clients that cannot call it directly
//! (browsers hitting CORS). Responses are the upstream JSON, untouched.

pub mod error;
pub mod search;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::DramaboxClient;
use crate::config::Config;

pub use error::ProxyError;

#[derive(Clone)]
pub struct ServerState {
    pub client: Arc<DramaboxClient>,
}

impl ServerState {
    pub fn new(client: DramaboxClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

/// Build the proxy router
pub fn router(state: ServerState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/search", get(search::search))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl-C
pub async fn serve(config: &Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid server address {}:{}", config.server.host, config.server.port))?;

    let state = ServerState::new(DramaboxClient::from_config(&config.api));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Search proxy listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await
        .context("Server error")?;
    Ok(())
}
