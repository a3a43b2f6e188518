use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row};

use crate::domain::{Article, Item};
use crate::errors::{FeederError, FeederResult};
use crate::storage::sqlite::SqliteStorage;
use crate::storage::traits::ArticleRepository;

const SELECT_ARTICLE: &str = "SELECT a.id, a.source_id, s.name, a.title, a.categories, a.link, \
     a.summary, a.pub_date, a.published, a.generated_summary, a.published_at \
     FROM articles a JOIN sources s ON s.id = a.source_id";

#[derive(Clone)]
pub struct SqliteArticleRepository {
    storage: SqliteStorage,
}

impl SqliteArticleRepository {
    pub fn new(storage: SqliteStorage) -> Self {
        Self { storage }
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

fn article_from_row(row: &Row<'_>) -> rusqlite::Result<Article> {
    let categories: String = row.get(4)?;
    let published_at: Option<i64> = row.get(10)?;

    Ok(Article {
        id: row.get(0)?,
        source_id: row.get(1)?,
        source_name: row.get(2)?,
        title: row.get(3)?,
        // Categories are only informational, a malformed column reads as empty
        categories: serde_json::from_str(&categories).unwrap_or_default(),
        link: row.get(5)?,
        summary: row.get(6)?,
        pub_date: timestamp(row.get(7)?),
        published: row.get(8)?,
        generated_summary: row.get(9)?,
        published_at: published_at.map(timestamp),
    })
}

#[async_trait]
impl ArticleRepository for SqliteArticleRepository {
    async fn insert_if_absent(&self, source_id: i64, item: &Item) -> FeederResult<bool> {
        let categories = serde_json::to_string(&item.categories)?;
        let item = item.clone();

        self.storage
            .call(move |conn| {
                let inserted = conn.execute(
                    "INSERT INTO articles (source_id, title, categories, link, summary, pub_date) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                     ON CONFLICT(link) DO NOTHING",
                    (
                        source_id,
                        &item.title,
                        &categories,
                        &item.link,
                        &item.summary,
                        item.pub_date.timestamp(),
                    ),
                )?;
                Ok(inserted == 1)
            })
            .await
    }

    async fn unpublished_since(
        &self,
        since: DateTime<Utc>,
        limit: u64,
    ) -> FeederResult<Vec<Article>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        self.storage
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE a.published = 0 AND a.pub_date >= ?1 \
                     ORDER BY a.pub_date ASC, a.id ASC LIMIT ?2",
                    SELECT_ARTICLE
                ))?;
                let articles = stmt.query_map((since.timestamp(), limit), article_from_row)?;
                articles.collect::<Result<Vec<_>, _>>().map_err(FeederError::from)
            })
            .await
    }

    async fn mark_published(&self, id: i64, summary: &str) -> FeederResult<bool> {
        let summary = summary.to_string();

        self.storage
            .call(move |conn| {
                let updated = conn.execute(
                    "UPDATE articles SET published = 1, generated_summary = ?2, published_at = ?3 \
                     WHERE id = ?1 AND published = 0",
                    (id, &summary, Utc::now().timestamp()),
                )?;
                Ok(updated == 1)
            })
            .await
    }

    async fn get_by_link(&self, link: &str) -> FeederResult<Option<Article>> {
        let link = link.to_string();

        self.storage
            .call(move |conn| {
                let article = conn
                    .query_row(
                        &format!("{} WHERE a.link = ?1", SELECT_ARTICLE),
                        [&link],
                        article_from_row,
                    )
                    .optional()?;
                Ok(article)
            })
            .await
    }
}
