use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeederError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    // Source errors
    #[error("Invalid feed URL: {0}")]
    InvalidUrl(String),

    #[error("Source not found: {0}")]
    SourceNotFound(String),

    #[error("Source already exists: {0}")]
    SourceAlreadyExists(String),

    // Network errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    // Parsing errors
    #[error("Feed parsing failed: {0}")]
    FeedParse(String),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    // Storage errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Background task failed: {0}")]
    Task(String),

    // Summarization errors
    #[error("Summarization failed: {0}")]
    Summarization(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // User input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Channel errors from the telegram library
    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl FeederError {
    /// Cancellation is an expected way for a loop to stop, not a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FeederError::Cancelled)
    }
}

impl From<channels::ChannelError> for FeederError {
    fn from(err: channels::ChannelError) -> Self {
        FeederError::Channel(err.to_string())
    }
}

impl From<tokio::task::JoinError> for FeederError {
    fn from(err: tokio::task::JoinError) -> Self {
        FeederError::Task(err.to_string())
    }
}

pub type FeederResult<T> = Result<T, FeederError>;
