//! Source fetcher for the upstream news listing.
//!
//! [`ArticleSource`] is the seam between the scrape cycle and the outside
//! world: one call returns whatever raw entries a single listing page holds
//! right now (no pagination). The production implementation scrapes the
//! Hacker News front page; tests substitute their own source.
//!
//! HN markup notes: each story is a `tr.athing` whose `id` attribute is the
//! site-assigned item id. Score, author and age live in a *sibling* row's
//! `td.subtext`, so the two are paired up via the item id in the age
//! permalink (`item?id=...`). The `span.age` `title` attribute carries the
//! publish time, either as a bare ISO timestamp or as `<iso> <epoch>`.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

/// Fetch errors.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("listing request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid listing url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// A raw listing entry, before normalization.
#[derive(Debug, Clone)]
pub struct RawEntry {
    /// Site-assigned item id.
    pub id: String,
    pub title: String,
    /// Absolute URL (relative hrefs are resolved against the listing URL).
    pub url: String,
    /// Publish time in unix seconds, when the listing carried one.
    pub published_at: Option<i64>,
    pub points: Option<i64>,
    pub author: Option<String>,
}

/// One-shot listing fetch. Implementations may fail or return partial or
/// empty results; callers treat every cycle as independent.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    async fn fetch_listing(&self) -> Result<Vec<RawEntry>, FetchError>;
}

/// Scrapes the Hacker News front page.
pub struct HackerNewsSource {
    client: reqwest::Client,
    url: String,
}

impl HackerNewsSource {
    /// Request timeout. A hung upstream must not stall a scrape cycle forever.
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(source_url: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("newswired/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: source_url.to_string(),
        })
    }
}

#[async_trait]
impl ArticleSource for HackerNewsSource {
    async fn fetch_listing(&self) -> Result<Vec<RawEntry>, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;

        let base = Url::parse(&self.url)?;
        let entries = parse_listing(&body, &base);

        info!(count = entries.len(), url = %self.url, "Fetched listing");
        debug!(ids = ?entries.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(), "Listing item ids");

        Ok(entries)
    }
}

/// Subtext fields for one story, keyed by item id during parsing.
struct Subtext {
    published_at: Option<i64>,
    points: Option<i64>,
    author: Option<String>,
}

/// Parse a listing page into raw entries, in page order.
///
/// Rows without an id or title link are skipped; a story whose subtext row
/// is missing (job postings, markup drift) keeps `None` for those fields.
fn parse_listing(html: &str, base: &Url) -> Vec<RawEntry> {
    let document = Html::parse_document(html);
    let row_selector = Selector::parse("tr.athing").unwrap();
    let title_selector = Selector::parse("span.titleline > a").unwrap();
    let subtext_selector = Selector::parse("td.subtext").unwrap();
    let age_selector = Selector::parse("span.age").unwrap();
    let age_link_selector = Selector::parse("span.age > a").unwrap();
    let score_selector = Selector::parse("span.score").unwrap();
    let author_selector = Selector::parse("a.hnuser").unwrap();

    let mut subtexts: HashMap<String, Subtext> = HashMap::new();
    for subtext in document.select(&subtext_selector) {
        let Some(id) = subtext
            .select(&age_link_selector)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| href.strip_prefix("item?id="))
        else {
            continue;
        };

        let published_at = subtext
            .select(&age_selector)
            .next()
            .and_then(|age| age.value().attr("title"))
            .and_then(parse_age_title);
        let points = subtext
            .select(&score_selector)
            .next()
            .and_then(|score| {
                score
                    .text()
                    .collect::<String>()
                    .split_whitespace()
                    .next()?
                    .parse::<i64>()
                    .ok()
            });
        let author = subtext
            .select(&author_selector)
            .next()
            .map(|a| a.text().collect::<String>());

        subtexts.insert(
            id.to_string(),
            Subtext {
                published_at,
                points,
                author,
            },
        );
    }

    let mut entries = Vec::new();
    for row in document.select(&row_selector) {
        let Some(id) = row.value().attr("id") else {
            continue;
        };
        let Some(link) = row.select(&title_selector).next() else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Ok(url) = base.join(href) else {
            continue;
        };

        let title = link.text().collect::<String>();
        let subtext = subtexts.remove(id);

        entries.push(RawEntry {
            id: id.to_string(),
            title,
            url: url.to_string(),
            published_at: subtext.as_ref().and_then(|s| s.published_at),
            points: subtext.as_ref().and_then(|s| s.points),
            author: subtext.and_then(|s| s.author),
        });
    }

    entries
}

/// Parse the `span.age` `title` attribute into unix seconds.
///
/// The attribute is either a bare ISO timestamp (UTC) or `<iso> <epoch>`;
/// both halves encode the same instant, so the first token that parses wins.
fn parse_age_title(title: &str) -> Option<i64> {
    for token in title.split_whitespace() {
        if let Ok(epoch) = token.parse::<i64>() {
            return Some(epoch);
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(token, "%Y-%m-%dT%H:%M:%S") {
            return Some(dt.and_utc().timestamp());
        }
    }
    None
}
