use async_trait::async_trait;
use channels::ChannelClient;

use crate::config::TelegramConfig;
use crate::domain::notification::PARSE_MODE;
use crate::errors::FeederResult;

/// Posts rendered messages to one fixed destination
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, text: &str) -> FeederResult<()>;
}

/// Sends MarkdownV2 messages to a Telegram channel
pub struct ChannelPublisher {
    client: ChannelClient,
    channel_id: String,
}

impl ChannelPublisher {
    pub fn new(client: ChannelClient, channel_id: impl Into<String>) -> Self {
        Self {
            client,
            channel_id: channel_id.into(),
        }
    }

    pub fn from_config(config: &TelegramConfig) -> FeederResult<Self> {
        let client = ChannelClient::new(&config.api_url, &config.bot_token)?;
        Ok(Self::new(client, config.channel_id.clone()))
    }
}

#[async_trait]
impl MessageSender for ChannelPublisher {
    async fn send(&self, text: &str) -> FeederResult<()> {
        self.client
            .send_message(&self.channel_id, text, Some(PARSE_MODE))
            .await?;
        Ok(())
    }
}
