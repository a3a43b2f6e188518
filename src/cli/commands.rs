use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "feedbot")]
#[command(about = "Watches RSS feeds and posts summarized articles to a Telegram channel")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the fetcher, the notifier and the command bot until Ctrl-C
    Run,

    /// Add a new RSS or Atom source
    AddSource {
        /// Display name used in posted messages
        name: String,

        /// Feed URL
        url: String,

        /// Store the source without downloading the feed first
        #[arg(long)]
        no_check: bool,
    },

    /// Remove a source by ID
    RemoveSource {
        /// Source ID as shown by list-sources
        id: i64,
    },

    /// List all sources
    ListSources,
}
