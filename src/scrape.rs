//! Scrape coordinator - one fetch-and-dedupe pass against the source.
//!
//! The cycle contract is deliberately infallible: network, parse, and store
//! failures are logged and degrade to "zero new articles" so a bad upstream
//! can never take a session (or the process) down with it. All cross-cycle
//! memory lives in the database; cycles themselves are stateless.

use crate::db::{Article, Database, NewArticle};
use crate::fetch::{ArticleSource, RawEntry};
use crate::metrics;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Runs scrape cycles on behalf of sessions.
#[derive(Clone)]
pub struct ScrapeCoordinator {
    source: Arc<dyn ArticleSource>,
    db: Database,
}

impl ScrapeCoordinator {
    pub fn new(source: Arc<dyn ArticleSource>, db: Database) -> Self {
        Self { source, db }
    }

    /// Run one scrape cycle and return the newly inserted articles, in
    /// source order. Returns an empty list on any failure.
    pub async fn run_cycle(&self) -> Vec<Article> {
        metrics::record_scrape_cycle();

        let entries = match self.source.fetch_listing().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Listing fetch failed, treating cycle as empty");
                metrics::record_scrape_failure();
                return Vec::new();
            }
        };

        let now = chrono::Utc::now().timestamp();
        let mut inserted = Vec::new();

        for entry in entries {
            let article = normalize(entry, now);
            match self.db.articles().insert_if_absent(&article).await {
                Ok(true) => inserted.push(Article::from(article)),
                Ok(false) => {}
                Err(e) => {
                    // One bad row must not abort the rest of the listing.
                    warn!(error = %e, id = %article.id, "Failed to store article");
                }
            }
        }

        if inserted.is_empty() {
            debug!("Scrape cycle found no new articles");
        } else {
            info!(count = inserted.len(), "Scrape cycle inserted new articles");
            metrics::record_articles_inserted(inserted.len());
        }

        inserted
    }

    /// All stored articles published within the last `window_secs` seconds,
    /// newest first.
    pub async fn recent_window(
        &self,
        window_secs: u64,
    ) -> Result<Vec<Article>, crate::db::DbError> {
        let since = chrono::Utc::now().timestamp() - window_secs as i64;
        self.db.articles().recent_since(since).await
    }
}

/// Apply fetch-time fallbacks to a raw entry.
fn normalize(entry: RawEntry, fetched_at: i64) -> NewArticle {
    NewArticle {
        id: entry.id,
        title: entry.title,
        url: entry.url,
        published_at: entry.published_at.unwrap_or(fetched_at),
        points: entry.points,
        author: entry.author,
        scraped_at: fetched_at,
    }
}
