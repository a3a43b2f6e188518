use std::time::Duration;

use channels::MAX_MESSAGE_CHARS;
use chrono::Utc;
use tokio::time::MissedTickBehavior;

use crate::domain::{FreshnessWindow, Notification};
use crate::errors::FeederResult;
use crate::services::publisher::MessageSender;
use crate::shutdown::Shutdown;
use crate::storage::traits::ArticleRepository;
use crate::summary::Summarizer;

/// What a single notifier tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No fresh unpublished article
    Idle,
    /// The article was posted and marked published
    Published(i64),
    /// Summarizing or posting failed; the article stays a candidate
    Skipped(i64),
}

/// Summarizes and posts at most one fresh article per interval
pub struct NotificationService<A: ArticleRepository, S: Summarizer, M: MessageSender> {
    article_repository: A,
    summarizer: S,
    sender: M,
    interval: Duration,
    window: FreshnessWindow,
    prompt: String,
}

impl<A: ArticleRepository, S: Summarizer, M: MessageSender> NotificationService<A, S, M> {
    pub fn new(
        article_repository: A,
        summarizer: S,
        sender: M,
        interval: Duration,
        window: FreshnessWindow,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            article_repository,
            summarizer,
            sender,
            interval,
            window,
            prompt: prompt.into(),
        }
    }

    /// Runs notifier ticks until shutdown. The first tick happens one
    /// interval after start.
    ///
    /// Returns `Ok(())` on shutdown and an error only when candidates cannot
    /// be queried.
    pub async fn start(&self, shutdown: Shutdown) -> FeederResult<()> {
        tracing::info!(
            interval = ?self.interval,
            window = ?self.window.width(),
            "notifier started"
        );

        let mut timer = tokio::time::interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Skip first tick (immediate)
        timer.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::info!("notifier stopped");
                    return Ok(());
                }
                _ = timer.tick() => {
                    match self.notify_once(&shutdown).await {
                        Ok(_) => {}
                        Err(e) if e.is_cancelled() => {}
                        Err(e) => return Err(e),
                    }
                }
            }
        }
    }

    /// Picks the oldest fresh unpublished article and tries to post it
    pub async fn notify_once(&self, shutdown: &Shutdown) -> FeederResult<TickOutcome> {
        let since = self.window.start(Utc::now());
        let mut candidates = self.article_repository.unpublished_since(since, 1).await?;

        let Some(article) = candidates.pop() else {
            tracing::debug!("no articles to publish");
            return Ok(TickOutcome::Idle);
        };

        let text = article.text_for_summary();
        let summary = match shutdown
            .guard(self.summarizer.summarize(&text, &self.prompt))
            .await
        {
            Ok(summary) => summary,
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                tracing::warn!(article = article.id, link = %article.link, error = %e, "failed to summarize article");
                return Ok(TickOutcome::Skipped(article.id));
            }
        };

        let message = Notification::from_article(&article, &summary).format(MAX_MESSAGE_CHARS);

        match shutdown.guard(self.sender.send(&message)).await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                tracing::warn!(article = article.id, link = %article.link, error = %e, "failed to publish article");
                return Ok(TickOutcome::Skipped(article.id));
            }
        }

        match self.article_repository.mark_published(article.id, &summary).await {
            Ok(true) => {
                tracing::info!(article = article.id, source = %article.source_name, title = %article.title, "article published");
            }
            Ok(false) => {
                tracing::warn!(article = article.id, "article was already marked published");
            }
            Err(e) => {
                tracing::error!(article = article.id, error = %e, "article posted but could not be marked published");
            }
        }

        Ok(TickOutcome::Published(article.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::DateTime;

    use crate::domain::{Item, NewSource};
    use crate::errors::FeederError;
    use crate::services::publisher::MockMessageSender;
    use crate::storage::sqlite::{SqliteArticleRepository, SqliteSourceRepository, SqliteStorage};
    use crate::storage::traits::{MockArticleRepository, SourceRepository};
    use crate::summary::MockSummarizer;

    const WINDOW: Duration = Duration::from_secs(120);

    #[derive(Clone, Copy, PartialEq)]
    enum SendBehavior {
        Ok,
        Fail,
        Hang,
    }

    /// Records every message it is asked to send
    #[derive(Clone)]
    struct RecordingSender {
        sent: Arc<Mutex<Vec<String>>>,
        behavior: SendBehavior,
    }

    impl RecordingSender {
        fn new(behavior: SendBehavior) -> Self {
            Self {
                sent: Arc::new(Mutex::new(Vec::new())),
                behavior,
            }
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessageSender for RecordingSender {
        async fn send(&self, text: &str) -> FeederResult<()> {
            match self.behavior {
                SendBehavior::Ok => {
                    self.sent.lock().unwrap().push(text.to_string());
                    Ok(())
                }
                SendBehavior::Fail => Err(FeederError::Channel("Bad Gateway".to_string())),
                SendBehavior::Hang => std::future::pending().await,
            }
        }
    }

    fn echo_summarizer() -> MockSummarizer {
        let mut summarizer = MockSummarizer::new();
        summarizer
            .expect_summarize()
            .returning(|text, _| Ok(format!("Summary of {}", text)));
        summarizer
    }

    fn failing_summarizer() -> MockSummarizer {
        let mut summarizer = MockSummarizer::new();
        summarizer
            .expect_summarize()
            .returning(|_, _| Err(FeederError::Summarization("rate limited".to_string())));
        summarizer
    }

    fn minutes_ago(minutes: i64) -> DateTime<Utc> {
        Utc::now() - chrono::Duration::minutes(minutes)
    }

    async fn store(articles: &[(&str, DateTime<Utc>)]) -> SqliteArticleRepository {
        let storage = SqliteStorage::in_memory().unwrap();
        let source_id = SqliteSourceRepository::new(storage.clone())
            .add(&NewSource::new("Example", "https://example.com/feed"))
            .await
            .unwrap();

        let repo = SqliteArticleRepository::new(storage);
        for (link, pub_date) in articles {
            let item = Item::new(*link, format!("Title {}", link), *pub_date).with_summary(*link);
            repo.insert_if_absent(source_id, &item).await.unwrap();
        }
        repo
    }

    fn service<S: Summarizer>(
        repo: SqliteArticleRepository,
        summarizer: S,
        sender: RecordingSender,
        window: Duration,
    ) -> NotificationService<SqliteArticleRepository, S, RecordingSender> {
        NotificationService::new(
            repo,
            summarizer,
            sender,
            Duration::from_millis(100),
            FreshnessWindow::new(window),
            "Summarize:",
        )
    }

    #[tokio::test]
    async fn test_publishes_one_per_tick_oldest_first() {
        let repo = store(&[
            ("c", minutes_ago(1)),
            ("a", minutes_ago(5)),
            ("e", minutes_ago(1)),
            ("b", minutes_ago(4)),
            ("d", minutes_ago(1)),
        ])
        .await;
        let sender = RecordingSender::new(SendBehavior::Ok);
        let notifier = service(repo.clone(), echo_summarizer(), sender.clone(), Duration::from_secs(600));
        let (_trigger, shutdown) = Shutdown::new();

        for expected in 1..=5 {
            let outcome = notifier.notify_once(&shutdown).await.unwrap();
            assert!(matches!(outcome, TickOutcome::Published(_)));
            assert_eq!(sender.sent().len(), expected, "at most one publish per tick");
        }
        assert_eq!(notifier.notify_once(&shutdown).await.unwrap(), TickOutcome::Idle);

        let order: Vec<String> = sender
            .sent()
            .iter()
            .map(|m| m.lines().next().unwrap().to_string())
            .collect();
        // Equal dates fall back to insertion order
        assert_eq!(
            order,
            vec!["*Title a*", "*Title b*", "*Title c*", "*Title e*", "*Title d*"]
        );

        let stored = repo.get_by_link("a").await.unwrap().unwrap();
        assert!(stored.published);
        assert_eq!(stored.generated_summary.as_deref(), Some("Summary of a"));
    }

    #[tokio::test]
    async fn test_article_outside_window_not_selected() {
        let repo = store(&[("stale", minutes_ago(3))]).await;
        let sender = RecordingSender::new(SendBehavior::Ok);
        let notifier = service(repo, echo_summarizer(), sender.clone(), WINDOW);
        let (_trigger, shutdown) = Shutdown::new();

        assert_eq!(notifier.notify_once(&shutdown).await.unwrap(), TickOutcome::Idle);
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn test_summary_failure_leaves_article_pending() {
        let repo = store(&[("x", minutes_ago(1))]).await;
        let sender = RecordingSender::new(SendBehavior::Ok);
        let notifier = service(repo.clone(), failing_summarizer(), sender.clone(), WINDOW);
        let (_trigger, shutdown) = Shutdown::new();

        let outcome = notifier.notify_once(&shutdown).await.unwrap();

        assert!(matches!(outcome, TickOutcome::Skipped(_)));
        assert!(sender.sent().is_empty());
        assert!(!repo.get_by_link("x").await.unwrap().unwrap().published);
    }

    #[tokio::test]
    async fn test_publish_failure_retried_next_tick() {
        let repo = store(&[("x", minutes_ago(1))]).await;
        let (_trigger, shutdown) = Shutdown::new();

        let failing = service(
            repo.clone(),
            echo_summarizer(),
            RecordingSender::new(SendBehavior::Fail),
            WINDOW,
        );
        assert!(matches!(
            failing.notify_once(&shutdown).await.unwrap(),
            TickOutcome::Skipped(_)
        ));
        assert!(!repo.get_by_link("x").await.unwrap().unwrap().published);

        let sender = RecordingSender::new(SendBehavior::Ok);
        let working = service(repo.clone(), echo_summarizer(), sender.clone(), WINDOW);
        assert!(matches!(
            working.notify_once(&shutdown).await.unwrap(),
            TickOutcome::Published(_)
        ));
        assert_eq!(sender.sent().len(), 1);
        assert!(repo.get_by_link("x").await.unwrap().unwrap().published);
    }

    #[tokio::test]
    async fn test_query_failure_stops_loop() {
        let mut repo = MockArticleRepository::new();
        repo.expect_unpublished_since()
            .returning(|_, _| Err(FeederError::Database(rusqlite::Error::InvalidQuery)));

        let notifier = NotificationService::new(
            repo,
            MockSummarizer::new(),
            MockMessageSender::new(),
            Duration::from_millis(10),
            FreshnessWindow::new(WINDOW),
            "Summarize:",
        );
        let (_trigger, shutdown) = Shutdown::new();

        let result = tokio::time::timeout(Duration::from_secs(1), notifier.start(shutdown))
            .await
            .expect("loop should stop on store failure");
        assert!(matches!(result, Err(FeederError::Database(_))));
    }

    #[tokio::test]
    async fn test_mark_failure_is_not_fatal() {
        let article = crate::domain::Article {
            id: 9,
            source_id: 1,
            source_name: "Example".to_string(),
            title: "Title".to_string(),
            categories: Vec::new(),
            link: "https://example.com/9".to_string(),
            pub_date: Utc::now(),
            summary: "Body".to_string(),
            published: false,
            generated_summary: None,
            published_at: None,
        };

        let mut repo = MockArticleRepository::new();
        repo.expect_unpublished_since()
            .returning(move |_, _| Ok(vec![article.clone()]));
        repo.expect_mark_published()
            .withf(|id, summary| *id == 9 && summary.to_string() == "Summary of Body")
            .times(1)
            .returning(|_, _| Err(FeederError::Database(rusqlite::Error::InvalidQuery)));

        let mut sender = MockMessageSender::new();
        sender.expect_send().times(1).returning(|_| Ok(()));

        let notifier = NotificationService::new(
            repo,
            echo_summarizer(),
            sender,
            Duration::from_secs(60),
            FreshnessWindow::new(WINDOW),
            "Summarize:",
        );
        let (_trigger, shutdown) = Shutdown::new();

        assert_eq!(
            notifier.notify_once(&shutdown).await.unwrap(),
            TickOutcome::Published(9)
        );
    }

    #[tokio::test]
    async fn test_first_tick_waits_one_interval() {
        let repo = store(&[("x", minutes_ago(1))]).await;
        let sender = RecordingSender::new(SendBehavior::Ok);
        let notifier = NotificationService::new(
            repo,
            echo_summarizer(),
            sender.clone(),
            Duration::from_millis(300),
            FreshnessWindow::new(WINDOW),
            "Summarize:",
        );
        let (trigger, shutdown) = Shutdown::new();
        let handle = tokio::spawn(async move { notifier.start(shutdown).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(sender.sent().is_empty(), "nothing is posted before the first interval");

        let mut posted = false;
        for _ in 0..200 {
            if !sender.sent().is_empty() {
                posted = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(posted);

        trigger.trigger();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_during_publish_returns_promptly() {
        let repo = store(&[("x", minutes_ago(1))]).await;
        let notifier = NotificationService::new(
            repo.clone(),
            echo_summarizer(),
            RecordingSender::new(SendBehavior::Hang),
            Duration::from_millis(10),
            FreshnessWindow::new(WINDOW),
            "Summarize:",
        );
        let (trigger, shutdown) = Shutdown::new();
        let handle = tokio::spawn(async move { notifier.start(shutdown).await });

        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.trigger();

        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("notifier should stop while the send is outstanding")
            .unwrap();
        assert!(result.is_ok());
        assert!(!repo.get_by_link("x").await.unwrap().unwrap().published);
    }

    #[tokio::test]
    async fn test_loop_posts_at_most_one_per_interval() {
        let repo = store(&[
            ("a", minutes_ago(1)),
            ("b", minutes_ago(1)),
            ("c", minutes_ago(1)),
            ("d", minutes_ago(1)),
            ("e", minutes_ago(1)),
        ])
        .await;
        let interval = Duration::from_millis(200);
        let sender = RecordingSender::new(SendBehavior::Ok);
        let notifier = NotificationService::new(
            repo,
            echo_summarizer(),
            sender.clone(),
            interval,
            FreshnessWindow::new(WINDOW),
            "Summarize:",
        );
        let (trigger, shutdown) = Shutdown::new();

        let started = std::time::Instant::now();
        let handle = tokio::spawn(async move { notifier.start(shutdown).await });

        tokio::time::sleep(Duration::from_millis(700)).await;
        trigger.trigger();
        handle.await.unwrap().unwrap();
        let elapsed = started.elapsed();

        let posted = sender.sent().len();
        let max_ticks = (elapsed.as_millis() / interval.as_millis()) as usize;
        assert!(posted >= 1, "the loop publishes once the first interval passes");
        assert!(
            posted <= max_ticks,
            "{} posts in {:?} exceeds one per interval",
            posted,
            elapsed
        );
        assert!(posted < 5, "the backlog is drained one tick at a time");
    }
}
