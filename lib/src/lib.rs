//! Telegram Bot API bindings for Rust
//! Provides functions to send messages, register bot commands and poll for updates

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Telegram rejects text messages longer than this many characters
pub const MAX_MESSAGE_CHARS: usize = 4096;

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Bot API error {code}: {description}")]
    Api { code: i64, description: String },
    #[error("Chat not found: {0}")]
    ChatNotFound(String),
    #[error("Payload too large")]
    PayloadTooLarge,
}

fn deserialize_string_or_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct StringOrI64Visitor;

    impl<'de> Visitor<'de> for StringOrI64Visitor {
        type Value = i64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or i64")
        }

        fn visit_i64<E>(self, v: i64) -> Result<i64, E> {
            Ok(v)
        }

        fn visit_u64<E>(self, v: u64) -> Result<i64, E> {
            Ok(v as i64)
        }

        fn visit_str<E>(self, v: &str) -> Result<i64, E>
        where
            E: de::Error,
        {
            v.parse().map_err(de::Error::custom)
        }
    }

    deserializer.deserialize_any(StringOrI64Visitor)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    #[serde(deserialize_with = "deserialize_string_or_i64")]
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

impl Message {
    /// Returns the bot command carried by this message, without the leading
    /// slash and any `@botname` suffix.
    pub fn command(&self) -> Option<&str> {
        let text = self.text.as_deref()?.trim();
        let word = text.strip_prefix('/')?.split_whitespace().next()?;
        let name = word.split('@').next().unwrap_or(word);
        (!name.is_empty()).then_some(name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BotCommand {
    pub command: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T, ChannelError> {
        let description = self.description.unwrap_or_default();
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            _ if description.contains("message is too long") => Err(ChannelError::PayloadTooLarge),
            _ if description.contains("chat not found") => Err(ChannelError::ChatNotFound(description)),
            _ => Err(ChannelError::Api {
                code: self.error_code.unwrap_or_default(),
                description,
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct SendMessagePayload<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
    disable_web_page_preview: bool,
}

#[derive(Debug, Serialize)]
struct SetMyCommandsPayload<'a> {
    commands: &'a [BotCommand],
}

#[derive(Debug, Serialize)]
struct GetUpdatesPayload {
    offset: i64,
    timeout: u64,
    allowed_updates: Vec<&'static str>,
}

#[derive(Clone)]
pub struct ChannelClient {
    url: String,
    client: Client,
}

impl ChannelClient {
    pub fn new(api_url: &str, token: &str) -> Result<Self, ChannelError> {
        let client = Client::builder().build()?;

        Ok(Self {
            url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
            client,
        })
    }

    async fn call<P, T>(&self, method: &str, payload: &P) -> Result<T, ChannelError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}/{}", self.url, method))
            .json(payload)
            .send()
            .await?;

        // Other failures arrive as a JSON body with `ok=false`
        if response.status() == reqwest::StatusCode::PAYLOAD_TOO_LARGE {
            return Err(ChannelError::PayloadTooLarge);
        }

        let body: ApiResponse<T> = response.json().await?;
        body.into_result()
    }

    /// Send a text message to a chat (numeric id or `@channelname`)
    pub async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        parse_mode: Option<&str>,
    ) -> Result<Message, ChannelError> {
        let payload = SendMessagePayload {
            chat_id,
            text,
            parse_mode,
            disable_web_page_preview: false,
        };

        self.call("sendMessage", &payload).await
    }

    /// Replace the list of commands shown in the client's command menu
    pub async fn set_my_commands(&self, commands: &[BotCommand]) -> Result<(), ChannelError> {
        let _: bool = self
            .call("setMyCommands", &SetMyCommandsPayload { commands })
            .await?;
        Ok(())
    }

    /// Long-poll for new messages, waiting at most `timeout` on the server side
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout: Duration,
    ) -> Result<Vec<Update>, ChannelError> {
        let payload = GetUpdatesPayload {
            offset,
            timeout: timeout.as_secs(),
            allowed_updates: vec!["message"],
        };

        self.call("getUpdates", &payload).await
    }
}

/// Create a new channel client
pub fn create_client(api_url: &str, token: &str) -> Result<ChannelClient, ChannelError> {
    ChannelClient::new(api_url, token)
}
