//! newswired - live Hacker News wire.
//!
//! Scrapes the front page on a per-session schedule, deduplicates into
//! SQLite, and pushes windowed article updates to each connected WebSocket
//! client.

mod config;
mod db;
mod fetch;
mod http;
mod metrics;
mod scrape;
mod session;

use crate::config::Config;
use crate::db::Database;
use crate::fetch::HackerNewsSource;
use crate::scrape::ScrapeCoordinator;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    info!(
        listen = %config.server.listen,
        source = %config.scrape.source_url,
        poll_interval_ms = config.scrape.poll_interval_ms,
        window_secs = config.scrape.window_secs,
        "Starting newswired"
    );

    // Initialize database
    let db = Database::new(&config.database.path).await?;

    let stored = db.articles().count().await.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to count stored articles");
        0
    });
    info!(count = stored, "Article store ready");

    // Prometheus metrics, served at /metrics on the main router
    metrics::init();
    info!("Metrics initialized");

    // Source fetcher + per-session scrape coordinator
    let source = HackerNewsSource::new(&config.scrape.source_url)?;
    let coordinator = ScrapeCoordinator::new(Arc::new(source), db.clone());

    let state = Arc::new(http::AppState {
        config,
        coordinator,
    });

    http::run_http_server(state).await?;

    Ok(())
}
