use std::time::Duration;

use futures::future::join_all;
use tokio::time::MissedTickBehavior;

use crate::domain::{Item, KeywordFilter, Source};
use crate::errors::FeederResult;
use crate::shutdown::Shutdown;
use crate::sources::SourceBuilder;
use crate::storage::traits::{ArticleRepository, SourceRepository};

/// Counters for one pass over all sources
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchReport {
    pub sources: usize,
    pub failed: usize,
    pub fetched: usize,
    pub kept: usize,
    pub inserted: usize,
}

/// Per-source outcome inside a cycle
#[derive(Debug, Default)]
struct SourceOutcome {
    failed: bool,
    fetched: usize,
    kept: usize,
    inserted: usize,
}

/// Polls every configured source and stores new, relevant items
pub struct FetchService<S: SourceRepository, A: ArticleRepository, B: SourceBuilder> {
    source_repository: S,
    article_repository: A,
    source_builder: B,
    interval: Duration,
    filter: KeywordFilter,
}

impl<S: SourceRepository, A: ArticleRepository, B: SourceBuilder> FetchService<S, A, B> {
    pub fn new(
        source_repository: S,
        article_repository: A,
        source_builder: B,
        interval: Duration,
        filter: KeywordFilter,
    ) -> Self {
        Self {
            source_repository,
            article_repository,
            source_builder,
            interval,
            filter,
        }
    }

    /// Runs fetch cycles until shutdown.
    ///
    /// The first cycle starts immediately, later ones every `interval`.
    /// Returns `Ok(())` on shutdown and an error only when the source list
    /// cannot be loaded.
    pub async fn start(&self, shutdown: Shutdown) -> FeederResult<()> {
        tracing::info!(
            interval = ?self.interval,
            keyword_filter = !self.filter.is_empty(),
            "fetcher started"
        );

        let mut timer = tokio::time::interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::info!("fetcher stopped");
                    return Ok(());
                }
                _ = timer.tick() => {
                    self.fetch_all(&shutdown).await?;
                }
            }
        }
    }

    /// One pass over all sources. Per-source failures are logged and skipped.
    pub async fn fetch_all(&self, shutdown: &Shutdown) -> FeederResult<FetchReport> {
        let sources = self.source_repository.get_all().await?;
        let mut report = FetchReport {
            sources: sources.len(),
            ..FetchReport::default()
        };

        if sources.is_empty() {
            tracing::debug!("no sources configured");
            return Ok(report);
        }

        let outcomes = join_all(
            sources
                .iter()
                .map(|source| self.fetch_source(source, shutdown)),
        )
        .await;

        for outcome in outcomes {
            report.failed += usize::from(outcome.failed);
            report.fetched += outcome.fetched;
            report.kept += outcome.kept;
            report.inserted += outcome.inserted;
        }

        tracing::info!(
            sources = report.sources,
            failed = report.failed,
            fetched = report.fetched,
            kept = report.kept,
            inserted = report.inserted,
            "fetch cycle finished"
        );

        Ok(report)
    }

    async fn fetch_source(&self, source: &Source, shutdown: &Shutdown) -> SourceOutcome {
        let adapter = self.source_builder.build(source);

        let items = match adapter.fetch(shutdown).await {
            Ok(items) => items,
            Err(e) if e.is_cancelled() => {
                tracing::debug!(source = %source.name, "fetch abandoned on shutdown");
                return SourceOutcome::default();
            }
            Err(e) => {
                tracing::warn!(source = %source.name, url = %source.feed_url, error = %e, "failed to fetch source");
                return SourceOutcome {
                    failed: true,
                    ..SourceOutcome::default()
                };
            }
        };

        let fetched = items.len();
        let kept: Vec<Item> = items
            .into_iter()
            .filter(|item| self.filter.matches(item))
            .collect();

        let mut outcome = SourceOutcome {
            failed: false,
            fetched,
            kept: kept.len(),
            inserted: 0,
        };

        for item in &kept {
            match self.article_repository.insert_if_absent(source.id, item).await {
                Ok(true) => outcome.inserted += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(source = %source.name, link = %item.link, error = %e, "failed to store article");
                }
            }
        }

        outcome
    }
}
