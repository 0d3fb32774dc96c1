//! HTTP server: WebSocket upgrade endpoint, liveness check, metrics.
//!
//! One axum server carries all three routes. `/ws` is the single upgrade
//! endpoint; each accepted upgrade spawns an independent session. `/status`
//! and `/metrics` are plain handlers that never touch session state.

use crate::config::Config;
use crate::scrape::ScrapeCoordinator;
use crate::session;
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Shared, immutable application state handed to every session.
pub struct AppState {
    pub config: Config,
    pub coordinator: ScrapeCoordinator,
}

/// Static liveness payload for `GET /status`.
#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    message: String,
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/status", get(status_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Bind and serve until the process exits.
pub async fn run_http_server(state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = state.config.server.listen;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Handler for GET /ws - upgrades to a persistent connection and hands the
/// socket to a new session.
async fn ws_handler(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| session::run(socket, state))
}

/// Handler for GET /status - static "server is up" payload.
async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        message: format!(
            "WebSocket server is running on ws://{}",
            state.config.server.listen
        ),
    })
}

/// Handler for GET /metrics - Prometheus metrics in text format.
async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}
