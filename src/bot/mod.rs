//! Command handling loop for direct messages to the bot.

pub mod views;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use channels::{BotCommand, ChannelClient, Message, Update};

use crate::errors::{FeederError, FeederResult};
use crate::shutdown::Shutdown;

pub type CommandView = Arc<dyn Fn(&Message) -> String + Send + Sync>;

const POLL_TIMEOUT: Duration = Duration::from_secs(30);
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

struct Command {
    description: String,
    view: CommandView,
}

/// Answers registered slash commands by long polling the Bot API
pub struct CommandBot {
    client: ChannelClient,
    commands: BTreeMap<String, Command>,
}

impl CommandBot {
    pub fn new(client: ChannelClient) -> Self {
        Self {
            client,
            commands: BTreeMap::new(),
        }
    }

    pub fn register_command(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        view: CommandView,
    ) {
        self.commands.insert(
            name.into(),
            Command {
                description: description.into(),
                view,
            },
        );
    }

    fn bot_commands(&self) -> Vec<BotCommand> {
        self.commands
            .iter()
            .map(|(name, command)| BotCommand {
                command: name.clone(),
                description: command.description.clone(),
            })
            .collect()
    }

    /// Text to send back for `message`, if it carries a known command
    pub fn reply_for(&self, message: &Message) -> Option<String> {
        let command = self.commands.get(message.command()?)?;
        Some((command.view)(message))
    }

    /// Polls for commands until shutdown. Polling errors are logged and retried.
    pub async fn run(&self, shutdown: Shutdown) -> FeederResult<()> {
        if let Err(e) = self.client.set_my_commands(&self.bot_commands()).await {
            tracing::warn!(error = %e, "failed to register bot commands");
        }

        let mut offset = 0;
        loop {
            let updates = shutdown
                .guard(async {
                    self.client
                        .get_updates(offset, POLL_TIMEOUT)
                        .await
                        .map_err(FeederError::from)
                })
                .await;

            let updates = match updates {
                Ok(updates) => updates,
                Err(e) if e.is_cancelled() => {
                    tracing::info!("bot stopped");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to poll for updates");
                    tokio::select! {
                        _ = shutdown.cancelled() => {}
                        _ = tokio::time::sleep(ERROR_BACKOFF) => {}
                    }
                    continue;
                }
            };

            for update in updates {
                offset = next_offset(offset, &update);
                self.handle(update).await;
            }
        }
    }

    async fn handle(&self, update: Update) {
        let Some(message) = update.message else {
            return;
        };
        let Some(reply) = self.reply_for(&message) else {
            return;
        };

        let chat_id = message.chat.id.to_string();
        if let Err(e) = self.client.send_message(&chat_id, &reply, None).await {
            tracing::warn!(chat = %chat_id, error = %e, "failed to answer command");
        }
    }
}

fn next_offset(current: i64, update: &Update) -> i64 {
    current.max(update.update_id + 1)
}
