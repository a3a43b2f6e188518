use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Article, Item, NewSource, Source};
use crate::errors::FeederResult;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceRepository: Send + Sync {
    async fn add(&self, source: &NewSource) -> FeederResult<i64>;
    async fn remove(&self, id: i64) -> FeederResult<bool>;
    async fn get_all(&self) -> FeederResult<Vec<Source>>;
    async fn get_by_id(&self, id: i64) -> FeederResult<Option<Source>>;
    async fn exists(&self, feed_url: &str) -> FeederResult<bool>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Stores the item unless an article with the same link exists.
    /// Returns whether a row was inserted.
    async fn insert_if_absent(&self, source_id: i64, item: &Item) -> FeederResult<bool>;

    /// Unpublished articles dated at or after `since`, oldest first
    async fn unpublished_since(&self, since: DateTime<Utc>, limit: u64)
        -> FeederResult<Vec<Article>>;

    /// Flags the article published with its generated summary.
    /// Returns false when it was already published.
    async fn mark_published(&self, id: i64, summary: &str) -> FeederResult<bool>;

    async fn get_by_link(&self, link: &str) -> FeederResult<Option<Article>>;
}
