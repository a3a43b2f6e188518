use crate::domain::{NewSource, Source};
use crate::errors::{FeederError, FeederResult};
use crate::sources::SourceRegistry;
use crate::sources::registry::check_url;
use crate::storage::SourceRepository;

pub struct SourceService<R: SourceRepository> {
    repository: R,
    source_registry: SourceRegistry,
}

impl<R: SourceRepository> SourceService<R> {
    pub fn new(repository: R, source_registry: SourceRegistry) -> Self {
        Self {
            repository,
            source_registry,
        }
    }

    /// Add a new source by URL.
    /// With `verify` set the URL must serve a parseable feed.
    pub async fn add(&self, name: &str, url: &str, verify: bool) -> FeederResult<Source> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FeederError::InvalidInput("source name is empty".to_string()));
        }

        if self.repository.exists(url).await? {
            return Err(FeederError::SourceAlreadyExists(url.to_string()));
        }

        if verify {
            let metadata = self.source_registry.validate(url).await?;
            tracing::debug!(
                url = %url,
                title = ?metadata.title,
                entries = metadata.entry_count,
                "feed validated"
            );
        } else {
            check_url(url)?;
        }

        let new_source = NewSource::new(name, url);
        let id = self.repository.add(&new_source).await?;

        Ok(Source {
            id,
            name: new_source.name,
            feed_url: new_source.feed_url,
            created_at: None,
        })
    }

    /// Remove a source by ID
    pub async fn remove(&self, id: i64) -> FeederResult<()> {
        if self.repository.remove(id).await? {
            Ok(())
        } else {
            Err(FeederError::SourceNotFound(id.to_string()))
        }
    }

    pub async fn list(&self) -> FeederResult<Vec<Source>> {
        self.repository.get_all().await
    }
}
