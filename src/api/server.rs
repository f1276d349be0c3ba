//! Formula Bridge API server
//!
//! HTTP REST API over a single formula session, using Axum.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers;
use crate::session::FormulaSession;

/// API Server configuration
#[derive(Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub version: String,
    pub session: Arc<FormulaSession>,
}

impl AppState {
    pub fn new(session: Arc<FormulaSession>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            session,
        }
    }
}

/// Build the router with all endpoints and middleware
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/version", get(handlers::version))
        // Core API endpoints
        .route("/api/v1/functions", get(handlers::functions))
        .route("/api/v1/normalize", post(handlers::normalize))
        .route("/api/v1/validate", post(handlers::validate))
        .route("/api/v1/keys", post(handlers::keys))
        .route("/api/v1/check", post(handlers::check))
        .route("/api/v1/lookup", post(handlers::lookup))
        // State and middleware
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Run the API server
pub async fn run_api_server(config: ApiConfig, session: Arc<FormulaSession>) -> anyhow::Result<()> {
    // The CLI may already have installed a subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fbridge_server=info,tower_http=info".into()),
        )
        .try_init();

    let tables = session.index().len();
    let app = router(Arc::new(AppState::new(session)));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("🔁 Formula Bridge API Server starting on http://{}", addr);
    info!("   Schema: {} tables", tables);
    info!("   Endpoints: /api/v1/normalize, /api/v1/validate, /api/v1/keys, /api/v1/check, /api/v1/lookup, /api/v1/functions");
    info!("   Health: /health, Version: /version");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Formula Bridge API Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server...");
}
