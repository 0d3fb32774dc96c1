//! Article repository.
//!
//! Insert-if-absent and windowed range queries over the `articles` table.
//! Dedup relies on the TEXT primary key plus `ON CONFLICT DO NOTHING`, so
//! concurrent scrape cycles racing on the same item id can never produce a
//! duplicate row - the database enforces uniqueness, not the caller.

use super::DbError;
use sqlx::SqlitePool;

/// A stored article, as observed on the upstream listing.
#[derive(Debug, Clone)]
pub struct Article {
    /// Site-assigned item id. Stable across scrapes.
    pub id: String,
    pub title: String,
    pub url: String,
    /// Publish time, unix seconds. Fetch time when the listing gave none.
    pub published_at: i64,
    pub points: Option<i64>,
    pub author: Option<String>,
    /// When the first scrape cycle observed this id, unix seconds.
    pub scraped_at: i64,
}

/// A normalized listing entry ready for insertion.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub id: String,
    pub title: String,
    pub url: String,
    pub published_at: i64,
    pub points: Option<i64>,
    pub author: Option<String>,
    pub scraped_at: i64,
}

impl From<NewArticle> for Article {
    fn from(a: NewArticle) -> Self {
        Article {
            id: a.id,
            title: a.title,
            url: a.url,
            published_at: a.published_at,
            points: a.points,
            author: a.author,
            scraped_at: a.scraped_at,
        }
    }
}

/// Repository for article operations.
pub struct ArticleRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ArticleRepository<'a> {
    /// Create a new article repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert an article unless its id is already stored.
    ///
    /// Returns `true` when a row was actually inserted. Existing rows are
    /// left untouched - the store is append-only with respect to identity.
    pub async fn insert_if_absent(&self, article: &NewArticle) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO articles (id, title, url, published_at, points, author, scraped_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&article.id)
        .bind(&article.title)
        .bind(&article.url)
        .bind(article.published_at)
        .bind(article.points)
        .bind(&article.author)
        .bind(article.scraped_at)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// All articles published at or after `since` (unix seconds), newest first.
    pub async fn recent_since(&self, since: i64) -> Result<Vec<Article>, DbError> {
        let rows = sqlx::query_as::<_, (String, String, String, i64, Option<i64>, Option<String>, i64)>(
            r#"
            SELECT id, title, url, published_at, points, author, scraped_at
            FROM articles
            WHERE published_at >= ?
            ORDER BY published_at DESC
            "#,
        )
        .bind(since)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, title, url, published_at, points, author, scraped_at)| Article {
                    id,
                    title,
                    url,
                    published_at,
                    points,
                    author,
                    scraped_at,
                },
            )
            .collect())
    }

    /// Total number of stored articles.
    pub async fn count(&self) -> Result<i64, DbError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM articles")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
