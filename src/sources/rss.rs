use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feed_rs::model::Link;
use feed_rs::parser;
use reqwest::Client;

use crate::domain::{Item, Source};
use crate::errors::{FeederError, FeederResult};
use crate::shutdown::Shutdown;
use crate::sources::traits::{FeedMetadata, FeedSource};

/// RSS / Atom / JSON Feed source read over HTTP
pub struct RssSource {
    source_id: i64,
    name: String,
    feed_url: String,
    client: Client,
}

impl RssSource {
    pub fn new(client: Client, source: &Source) -> Self {
        Self {
            source_id: source.id,
            name: source.name.clone(),
            feed_url: source.feed_url.clone(),
            client,
        }
    }

    pub(crate) async fn load_feed(client: &Client, url: &str) -> FeederResult<feed_rs::model::Feed> {
        let response = client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;

        Self::parse_bytes(&bytes)
    }

    fn parse_bytes(bytes: &[u8]) -> FeederResult<feed_rs::model::Feed> {
        parser::parse(bytes).map_err(|e| FeederError::FeedParse(e.to_string()))
    }

    /// Fetch a feed once and describe it, without storing anything
    pub async fn probe(client: &Client, url: &str) -> FeederResult<FeedMetadata> {
        let feed = Self::load_feed(client, url).await?;

        Ok(FeedMetadata {
            title: feed.title.map(|t| t.content.trim().to_string()),
            feed_url: url.to_string(),
            entry_count: feed.entries.len(),
        })
    }
}

/// Normalize parsed entries into items stamped with `source_name`.
///
/// Entries without a link have no dedupe key and are skipped. Entries
/// without a date are treated as published at `fetched_at`.
pub fn items_from_feed(
    feed: feed_rs::model::Feed,
    source_name: &str,
    fetched_at: DateTime<Utc>,
) -> Vec<Item> {
    feed.entries
        .into_iter()
        .filter_map(|entry| {
            let link = canonical_link(entry.links)?;
            if link.is_empty() {
                return None;
            }

            let title = entry
                .title
                .map(|t| t.content.trim().to_string())
                .unwrap_or_else(|| "Untitled".to_string());

            let summary = entry
                .summary
                .map(|t| t.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .unwrap_or_default();

            let categories = entry
                .categories
                .into_iter()
                .map(|c| c.label.unwrap_or(c.term))
                .collect();

            let pub_date = entry.published.or(entry.updated).unwrap_or(fetched_at);

            Some(
                Item::new(link, title, pub_date)
                    .with_summary(summary.trim())
                    .with_categories(categories)
                    .with_source_name(source_name),
            )
        })
        .collect()
}

/// The article link of an entry: `alternate` first, then one without `rel`,
/// then whatever comes first. Atom feeds often list `replies` or `edit`
/// links ahead of the article itself.
fn canonical_link(links: Vec<Link>) -> Option<String> {
    let index = links
        .iter()
        .position(|l| l.rel.as_deref() == Some("alternate"))
        .or_else(|| links.iter().position(|l| l.rel.is_none()))
        .unwrap_or(0);

    links
        .into_iter()
        .nth(index)
        .map(|l| l.href.trim().to_string())
}

#[async_trait]
impl FeedSource for RssSource {
    fn id(&self) -> i64 {
        self.source_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, shutdown: &Shutdown) -> FeederResult<Vec<Item>> {
        let client = self.client.clone();
        let url = self.feed_url.clone();

        // reqwest has no notion of our shutdown signal, so the request runs
        // detached and is simply abandoned on cancellation
        let feed = shutdown
            .run_detached(async move { Self::load_feed(&client, &url).await })
            .await?;

        Ok(items_from_feed(feed, &self.name, Utc::now()))
    }
}
