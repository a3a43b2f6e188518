pub mod openai;

use async_trait::async_trait;

use crate::errors::FeederResult;

pub use openai::OpenAiSummarizer;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Condense `text` following `prompt`. No retries happen here.
    async fn summarize(&self, text: &str, prompt: &str) -> FeederResult<String>;
}

/// Drop whatever follows the last full stop, which is usually a sentence the
/// model was cut off in the middle of.
pub fn trim_incomplete_sentence(raw: &str) -> String {
    let raw = raw.trim();
    if raw.ends_with('.') {
        return raw.to_string();
    }

    match raw.rfind('.') {
        Some(pos) => raw[..=pos].to_string(),
        None => raw.to_string(),
    }
}
