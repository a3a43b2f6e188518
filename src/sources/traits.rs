use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{Item, Source};
use crate::errors::FeederResult;
use crate::shutdown::Shutdown;

#[derive(Debug, Clone)]
pub struct FeedMetadata {
    pub title: Option<String>,
    pub feed_url: String,
    pub entry_count: usize,
}

#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Id of the stored source this adapter reads
    fn id(&self) -> i64;

    /// Display name stamped on every fetched item
    fn name(&self) -> &str;

    /// Fetch and normalize the current feed entries.
    ///
    /// Returns `FeederError::Cancelled` as soon as `shutdown` is raised.
    async fn fetch(&self, shutdown: &Shutdown) -> FeederResult<Vec<Item>>;
}

/// Creates the adapter for a stored source
pub trait SourceBuilder: Send + Sync {
    fn build(&self, source: &Source) -> Arc<dyn FeedSource>;
}
