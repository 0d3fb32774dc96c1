//! Connection session - one per live WebSocket client.
//!
//! Each session runs in its own Tokio task with this lifecycle:
//!
//! ```text
//! upgrade -> initial snapshot (scrape + full window, one initialData frame)
//!         -> select! loop:
//!              interval tick  -> scrape cycle -> silent | articleUpdate
//!              inbound frame  -> ignored, unless close/error -> teardown
//! ```
//!
//! The interval lives on the task's stack, so teardown is structural: when
//! the loop breaks, the timer is gone and no further cycle or send can run
//! on this session's behalf. Sessions are fully independent - N clients
//! mean N pollers on the same cadence, sharing only the database.

use crate::db::Article;
use crate::http::AppState;
use crate::metrics;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// An article as serialized to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireArticle {
    pub id: String,
    pub title: String,
    pub url: String,
    /// ISO-8601, UTC.
    pub published_at: chrono::DateTime<chrono::Utc>,
    pub points: Option<i64>,
    pub author: Option<String>,
}

impl From<&Article> for WireArticle {
    fn from(article: &Article) -> Self {
        Self {
            id: article.id.clone(),
            title: article.title.clone(),
            url: article.url.clone(),
            published_at: chrono::DateTime::from_timestamp(article.published_at, 0)
                .unwrap_or(chrono::DateTime::UNIX_EPOCH),
            points: article.points,
            author: article.author.clone(),
        }
    }
}

/// Server-to-client frames. There is no client-to-server protocol.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "initialData", rename_all = "camelCase")]
    InitialData {
        recent_articles: Vec<WireArticle>,
        recent_articles_count: usize,
    },
    #[serde(rename = "articleUpdate")]
    ArticleUpdate { articles: Vec<WireArticle> },
}

impl ServerMessage {
    pub fn initial(articles: &[Article]) -> Self {
        let recent: Vec<WireArticle> = articles.iter().map(WireArticle::from).collect();
        ServerMessage::InitialData {
            recent_articles_count: recent.len(),
            recent_articles: recent,
        }
    }

    pub fn update(articles: &[Article]) -> Self {
        ServerMessage::ArticleUpdate {
            articles: articles.iter().map(WireArticle::from).collect(),
        }
    }
}

/// Drive one client connection to completion.
pub async fn run(socket: WebSocket, state: Arc<AppState>) {
    info!("Client connected");
    metrics::session_connected();

    let (sink, inbound) = socket.split();
    let mut session = Session { sink, state };
    session.run_loop(inbound).await;

    metrics::session_disconnected();
    info!("Client disconnected");
}

struct Session {
    sink: SplitSink<WebSocket, Message>,
    state: Arc<AppState>,
}

impl Session {
    fn window_secs(&self) -> u64 {
        self.state.config.scrape.window_secs
    }

    async fn run_loop(&mut self, mut inbound: SplitStream<WebSocket>) {
        // Initial snapshot: one scrape cycle (errors swallowed inside), then
        // the full current window. A store error here leaves the session
        // open - the next tick gets another chance.
        self.state.coordinator.run_cycle().await;
        match self.state.coordinator.recent_window(self.window_secs()).await {
            Ok(articles) => {
                info!(count = articles.len(), "Sending initial snapshot");
                if self.send(&ServerMessage::initial(&articles)).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to query window for initial snapshot");
            }
        }

        let mut ticker = tokio::time::interval(Duration::from_millis(
            self.state.config.scrape.poll_interval_ms,
        ));
        // A cycle that outlasts the interval skips the overlapping tick;
        // the select! below already guarantees no two cycles run at once
        // within one session.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick fires immediately. It is silent in practice, since
        // the snapshot's cycle just deduplicated the listing.

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.tick().await {
                        break;
                    }
                }
                frame = inbound.next() => {
                    match frame {
                        None => {
                            debug!("Client stream ended");
                            break;
                        }
                        Some(Err(e)) => {
                            debug!(error = %e, "WebSocket error");
                            break;
                        }
                        Some(Ok(Message::Close(_))) => {
                            debug!("Client sent close");
                            break;
                        }
                        // Inbound frames carry no protocol; ignore them.
                        Some(Ok(_)) => {}
                    }
                }
            }
        }
    }

    /// One periodic tick. Returns `false` when the session must close.
    async fn tick(&mut self) -> bool {
        let new_articles = self.state.coordinator.run_cycle().await;
        if new_articles.is_empty() {
            debug!("No new articles to send");
            return true;
        }

        // Clients always get the complete recomputed window, not the delta,
        // so one missed message never leaves them permanently behind.
        match self.state.coordinator.recent_window(self.window_secs()).await {
            Ok(articles) => {
                info!(
                    new = new_articles.len(),
                    window = articles.len(),
                    "Sending article update"
                );
                self.send(&ServerMessage::update(&articles)).await.is_ok()
            }
            Err(e) => {
                warn!(error = %e, "Failed to query window for update");
                true
            }
        }
    }

    async fn send(&mut self, message: &ServerMessage) -> Result<(), axum::Error> {
        let json = match serde_json::to_string(message) {
            Ok(json) => json,
            Err(e) => {
                // An encode failure is a server bug, not a dead channel;
                // drop the frame rather than the session.
                error!(error = %e, "Failed to encode outbound message");
                return Ok(());
            }
        };

        match self.sink.send(Message::Text(json)).await {
            Ok(()) => {
                metrics::record_message_sent();
                Ok(())
            }
            Err(e) => {
                // Expected when a cycle completes just after the client
                // goes away; the caller tears the session down.
                debug!(error = %e, "Send failed, closing session");
                metrics::record_send_failure();
                Err(e)
            }
        }
    }
}
