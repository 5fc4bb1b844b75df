//! REST API over a loaded project.
//!
//! Provides two GET endpoints:
//! - `/systems` lists the defined systems and their installation dates
//! - `/analysis/{system}` recomputes one system's savings with optional
//!   quantity, rounding step and range overrides

mod handlers;
mod types;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tracing::info;

use crate::config::AnalysisConfig;
use crate::engine::PreparedDataset;

pub use types::{AnalysisQuery, AnalysisResponse, ErrorResponse, SystemSummary};

/// Immutable application state shared across all request handlers.
///
/// The raw table and per-system aggregation are computed once at load time;
/// every analysis request reruns only the downstream stages, so no locks
/// are needed.
pub struct AppState {
    /// Parsed dataset with cached per-system load profiles.
    pub prepared: PreparedDataset,
    /// Exclusions and defaults applied to every request.
    pub config: AnalysisConfig,
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/systems", get(handlers::get_systems))
        .route("/analysis/{system}", get(handlers::get_analysis))
        .with_state(state)
}

/// Binds to the given address and serves the API until the server stops.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
