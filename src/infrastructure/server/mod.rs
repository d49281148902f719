//! HTTP/WebSocket edge: a thin wrapper over the core.

mod docs;
pub mod dto;
mod error;
mod routes;
mod state;
mod ws;

pub use error::{ApiError, ServeError};
pub use state::AppState;

use axum::routing::{delete, get, post};
use axum::Router;
use docs::ApiDoc;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .route("/health", get(routes::health::health_handler))
        .route("/api/chat", post(routes::chat::chat_handler))
        .route(
            "/api/sessions",
            get(routes::sessions::list_handler).post(routes::sessions::create_handler),
        )
        .route(
            "/api/sessions/:id",
            get(routes::sessions::summary_handler).delete(routes::sessions::clear_handler),
        )
        .route("/api/tools", get(routes::tools::list_handler))
        .route(
            "/api/permissions/:role",
            get(routes::tools::permissions_handler),
        )
        .route(
            "/api/metrics",
            get(routes::metrics::snapshot_handler).delete(routes::metrics::reset_handler),
        )
        .route(
            "/api/mcp/servers",
            get(routes::mcp::list_handler).post(routes::mcp::add_handler),
        )
        .route(
            "/api/mcp/servers/:id",
            delete(routes::mcp::remove_handler).patch(routes::mcp::update_handler),
        )
        .route(
            "/api/mcp/servers/:id/reconnect",
            post(routes::mcp::reconnect_handler),
        )
        .route("/api/mcp/tools", get(routes::mcp::tools_handler))
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds the listener, then connects external tool servers in the
/// background, then serves until ctrl-c. On shutdown, in-flight requests
/// finish and every external client is disconnected.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> Result<(), ServeError> {
    info!(%addr, "Binding HTTP listener");
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServeError::Bind { addr, source })?;

    // External servers connect only after the listener is up, so the
    // service is reachable even while slow children start.
    let federation = state.federation.clone();
    tokio::spawn(async move {
        let errors = federation.connect_all().await;
        if errors.is_empty() {
            info!("All enabled external tool servers connected");
        } else {
            info!(failed = errors.len(), "Some external tool servers failed to connect");
        }
    });

    let app = router(state.clone());
    info!(%addr, "HTTP server ready to accept connections");
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down: disconnecting external tool servers");
    state.federation.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
