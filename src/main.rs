use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use feedbot::bot::{views, CommandBot};
use feedbot::cli::{Cli, Commands};
use feedbot::config::Config;
use feedbot::domain::{FreshnessWindow, KeywordFilter};
use feedbot::errors::{FeederError, FeederResult};
use feedbot::services::{ChannelPublisher, FetchService, NotificationService, SourceService};
use feedbot::shutdown::Shutdown;
use feedbot::sources::SourceRegistry;
use feedbot::storage::sqlite::{SqliteArticleRepository, SqliteSourceRepository, SqliteStorage};
use feedbot::summary::OpenAiSummarizer;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> FeederResult<()> {
    let cli = Cli::parse();

    let config = Config::from_env()?;

    let storage = SqliteStorage::new(&config.db_path)?;
    let source_repo = SqliteSourceRepository::new(storage.clone());
    let article_repo = SqliteArticleRepository::new(storage);

    let source_registry = SourceRegistry::new();

    match cli.command {
        Commands::AddSource { name, url, no_check } => {
            cmd_add_source(&name, &url, !no_check, source_repo, source_registry).await
        }
        Commands::RemoveSource { id } => cmd_remove_source(id, source_repo).await,
        Commands::ListSources => cmd_list_sources(source_repo).await,
        Commands::Run => cmd_run(&config, source_repo, article_repo, source_registry).await,
    }
}

async fn cmd_add_source(
    name: &str,
    url: &str,
    verify: bool,
    source_repo: SqliteSourceRepository,
    source_registry: SourceRegistry,
) -> FeederResult<()> {
    let service = SourceService::new(source_repo, source_registry);

    if verify {
        println!("Validating feed: {}", url);
    }

    match service.add(name, url, verify).await {
        Ok(source) => {
            println!("Source added successfully!");
            println!("  ID: {}", source.id);
            println!("  Name: {}", source.name);
            println!("  URL: {}", source.feed_url);
            Ok(())
        }
        Err(FeederError::SourceAlreadyExists(_)) => {
            println!("Source already exists: {}", url);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

async fn cmd_remove_source(id: i64, source_repo: SqliteSourceRepository) -> FeederResult<()> {
    let service = SourceService::new(source_repo, SourceRegistry::new());
    service.remove(id).await?;
    println!("Removed source {}", id);
    Ok(())
}

async fn cmd_list_sources(source_repo: SqliteSourceRepository) -> FeederResult<()> {
    let service = SourceService::new(source_repo, SourceRegistry::new());
    let sources = service.list().await?;

    if sources.is_empty() {
        println!("No sources configured.");
        return Ok(());
    }

    println!("Configured sources:\n");
    for source in sources {
        println!("  {}. {}", source.id, source.name);
        println!("    URL: {}", source.feed_url);
        println!();
    }

    Ok(())
}

async fn cmd_run(
    config: &Config,
    source_repo: SqliteSourceRepository,
    article_repo: SqliteArticleRepository,
    source_registry: SourceRegistry,
) -> FeederResult<()> {
    let telegram = config.telegram()?;
    let freshness_window = config.freshness_window()?;

    let summarizer = OpenAiSummarizer::new(&config.summary);
    if !summarizer.is_enabled() {
        tracing::warn!("OPENAI_KEY is not set, articles will not be published");
    }

    let fetcher = Arc::new(FetchService::new(
        source_repo,
        article_repo.clone(),
        source_registry,
        config.fetch_interval,
        KeywordFilter::new(&config.filter_keywords),
    ));

    let notifier = Arc::new(NotificationService::new(
        article_repo,
        summarizer,
        ChannelPublisher::from_config(telegram)?,
        config.notification_interval,
        FreshnessWindow::new(freshness_window),
        config.summary.prompt.clone(),
    ));

    let mut bot = CommandBot::new(channels::create_client(&telegram.api_url, &telegram.bot_token)?);
    bot.register_command("start", "Show what this bot does", views::start_view());
    bot.register_command("help", "Show available commands", views::start_view());
    let bot = Arc::new(bot);

    tracing::info!(keywords = config.filter_keywords.len(), "starting feedbot");

    let (trigger, shutdown) = Shutdown::new();

    let tasks = vec![
        ("fetcher", tokio::spawn({
            let fetcher = Arc::clone(&fetcher);
            let shutdown = shutdown.clone();
            async move { fetcher.start(shutdown).await }
        })),
        ("notifier", tokio::spawn({
            let notifier = Arc::clone(&notifier);
            let shutdown = shutdown.clone();
            async move { notifier.start(shutdown).await }
        })),
        ("bot", tokio::spawn({
            let bot = Arc::clone(&bot);
            let shutdown = shutdown.clone();
            async move { bot.run(shutdown).await }
        })),
    ];

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    trigger.trigger();

    let mut failed = None;
    for (name, handle) in tasks {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) if e.is_cancelled() => {}
            Ok(Err(e)) => {
                tracing::error!(task = name, error = %e, "task failed");
                failed.get_or_insert(e);
            }
            Err(e) => {
                tracing::error!(task = name, error = %e, "task panicked");
                failed.get_or_insert(e.into());
            }
        }
    }

    match failed {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
