use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use url::Url;

use crate::domain::Source;
use crate::errors::{FeederError, FeederResult};
use crate::sources::rss::RssSource;
use crate::sources::traits::{FeedMetadata, FeedSource, SourceBuilder};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds feed adapters for stored sources, sharing one HTTP client
#[derive(Clone)]
pub struct SourceRegistry {
    client: Client,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Check that `url` is an http(s) address serving a parseable feed
    pub async fn validate(&self, url: &str) -> FeederResult<FeedMetadata> {
        check_url(url)?;
        RssSource::probe(&self.client, url).await
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceBuilder for SourceRegistry {
    fn build(&self, source: &Source) -> Arc<dyn FeedSource> {
        Arc::new(RssSource::new(self.client.clone(), source))
    }
}

/// Reject anything that is not an absolute http(s) URL with a host
pub fn check_url(url: &str) -> FeederResult<Url> {
    let parsed = Url::parse(url).map_err(|e| FeederError::InvalidUrl(format!("{}: {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(parsed),
        _ => Err(FeederError::InvalidUrl(url.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_url_accepts_http() {
        assert!(check_url("https://blog.rust-lang.org/feed.xml").is_ok());
        assert!(check_url("http://example.com/rss").is_ok());
    }

    #[test]
    fn test_check_url_rejects_other_schemes() {
        let invalid = ["ftp://example.com/feed", "not a url", "file:///etc/passwd", ""];

        for url in invalid {
            assert!(
                matches!(check_url(url), Err(FeederError::InvalidUrl(_))),
                "URL {:?} should be rejected",
                url
            );
        }
    }

    #[test]
    fn test_build_uses_source_identity() {
        let registry = SourceRegistry::new();
        let source = Source {
            id: 3,
            name: "Example".to_string(),
            feed_url: "https://example.com/feed".to_string(),
            created_at: None,
        };

        let adapter = registry.build(&source);
        assert_eq!(adapter.id(), 3);
        assert_eq!(adapter.name(), "Example");
    }

    #[tokio::test]
    async fn test_validate_rejects_bad_url_without_network() {
        let registry = SourceRegistry::new();
        let result = registry.validate("mailto:someone@example.com").await;
        assert!(matches!(result, Err(FeederError::InvalidUrl(_))));
    }
}
