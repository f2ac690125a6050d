//! HTTP API.
//!
//! JSON over HTTP with a uniform response envelope. The handlers are thin:
//! deserialize, call the matching service, wrap the result.

mod envelope;
mod handlers;

pub use envelope::{ApiFailure, ApiResponse, ErrorBody};

use crate::config::Config;
use crate::llm::NlQueryService;
use crate::pool::PoolManager;
use crate::service::{DatabaseService, QueryService};
use crate::store::MetaStore;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub databases: Arc<DatabaseService>,
    pub queries: Arc<QueryService>,
    pub nl_queries: Arc<NlQueryService>,
    pub pools: Arc<PoolManager>,
    pub store: Arc<MetaStore>,
}

/// Builds the application router.
pub fn router(state: AppState, config: &Config) -> Router {
    let cors = cors_layer(&config.server.cors_origins);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route(
            "/api/connections",
            get(handlers::list_connections).post(handlers::register_connection),
        )
        .route(
            "/api/connections/:id",
            get(handlers::get_connection)
                .put(handlers::update_connection)
                .delete(handlers::delete_connection),
        )
        .route("/api/connections/:id/test", post(handlers::test_connection))
        .route("/api/connections/:id/metadata", get(handlers::list_metadata))
        .route(
            "/api/connections/:id/metadata/refresh",
            post(handlers::refresh_metadata),
        )
        .route("/api/query", post(handlers::execute_query))
        .route("/api/nl-query", post(handlers::execute_nl_query))
        .route("/api/executions", get(handlers::list_executions))
        .route("/api/pools", get(handlers::pool_status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS from configuration; an empty origin list allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Binds and serves the API until the process is asked to stop.
pub async fn serve(state: AppState, config: &Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let app = router(state, config);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("db-scout listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    // SIGINT is enough for both interactive use and container runtimes.
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install shutdown handler: {e}");
    }
    info!("shutdown signal received");
}
