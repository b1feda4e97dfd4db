//! HTTP surface of the agent: job creation, status queries and the static
//! discovery endpoints.

pub mod dto;
pub mod error;
pub mod handlers;

use crate::application::orchestrator::Orchestrator;
use axum::Router;
use axum::routing::{get, post};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/start_job", post(handlers::start_job))
        .route("/status", get(handlers::status))
        .route("/availability", get(handlers::availability))
        .route("/input_schema", get(handlers::input_schema))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(orchestrator)
}

/// Serves the router on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    orchestrator: Arc<Orchestrator>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(address = ?listener.local_addr()?, "server listening");
    axum::serve(listener, router(orchestrator))
        .with_graceful_shutdown(shutdown)
        .await
}
