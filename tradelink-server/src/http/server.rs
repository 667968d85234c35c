//! Axum server setup
//!
//! Server skeleton with:
//! - CORS (permissive optional, localhost defaults otherwise)
//! - Tracing middleware
//! - Graceful shutdown on SIGTERM/Ctrl+C, closing chat connections

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::db::migrations;
use crate::realtime::ChatRegistry;

use super::routes;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:8000)
    pub bind_addr: SocketAddr,

    /// Allow permissive CORS (default: false = localhost only)
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            cors_permissive: false,
        }
    }
}

/// Shared application state
pub struct AppState {
    pub pool: PgPool,
    /// Live chat connections; not a source of truth.
    pub registry: ChatRegistry,
}

/// Build the application router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(routes::links::router())
        .merge(routes::complaints::router())
        .merge(routes::incidents::router())
        .merge(routes::messages::router())
        .merge(routes::ws::router());

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server.
///
/// Runs migrations, serves until a shutdown signal arrives, then closes
/// all live chat connections.
pub async fn run_server(pool: PgPool, config: ServerConfig) -> Result<(), ServerError> {
    migrations::run(&pool).await?;

    let state = Arc::new(AppState { pool, registry: ChatRegistry::new() });

    let cors = if config.cors_permissive {
        tracing::warn!("CORS: Permissive mode enabled - all origins allowed");
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin([
                "http://localhost:3000".parse().unwrap(),
                "http://localhost:8000".parse().unwrap(),
                "http://127.0.0.1:3000".parse().unwrap(),
                "http://127.0.0.1:8000".parse().unwrap(),
            ])
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let app = build_router(Arc::clone(&state)).layer(cors);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.registry.shutdown();
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8000);
        assert!(!config.cors_permissive);
    }
}
