use std::time::Duration;

use crate::errors::{FeederError, FeederResult};

pub const DEFAULT_PROMPT: &str = "You are a news editor. Summarize the following article in two or three \
sentences of plain text, keeping only the key facts. Do not add an introduction.";

const DEFAULT_FETCH_INTERVAL: Duration = Duration::from_secs(10 * 60);
const DEFAULT_NOTIFICATION_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_FRESHNESS_MULTIPLIER: u32 = 2;

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub api_url: String,
    pub bot_token: String,
    pub channel_id: String,
}

#[derive(Debug, Clone)]
pub struct SummaryConfig {
    pub api_key: String,
    pub prompt: String,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub fetch_interval: Duration,
    pub notification_interval: Duration,
    pub freshness_multiplier: u32,
    pub filter_keywords: Vec<String>,
    pub summary: SummaryConfig,
    /// Only needed by `run`; source management works without a bot
    pub telegram: Option<TelegramConfig>,
}

impl Config {
    /// Get the directory where the executable is located
    fn exe_dir() -> Option<std::path::PathBuf> {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    pub fn from_env() -> FeederResult<Self> {
        let exe_dir = Self::exe_dir();

        // Try to load .env from executable's directory first
        if let Some(ref dir) = exe_dir {
            let env_path = dir.join(".env");
            if env_path.exists() {
                dotenvy::from_path(&env_path).ok();
            }
        }
        // Fall back to current directory
        dotenvy::dotenv().ok();

        // Default db_path is relative to executable directory
        let db_path = std::env::var("FEEDBOT_DB_PATH").unwrap_or_else(|_| {
            exe_dir
                .map(|d| d.join("feedbot.db").to_string_lossy().into_owned())
                .unwrap_or_else(|| "./feedbot.db".to_string())
        });

        let fetch_interval = duration_var("FETCH_INTERVAL", DEFAULT_FETCH_INTERVAL)?;
        let notification_interval =
            duration_var("NOTIFICATION_INTERVAL", DEFAULT_NOTIFICATION_INTERVAL)?;

        let freshness_multiplier = match std::env::var("FRESHNESS_MULTIPLIER") {
            Ok(raw) => parse_multiplier(&raw).ok_or_else(|| {
                FeederError::Config(format!(
                    "FRESHNESS_MULTIPLIER must be a positive number: {}",
                    raw
                ))
            })?,
            Err(_) => DEFAULT_FRESHNESS_MULTIPLIER,
        };

        let filter_keywords = std::env::var("FILTER_KEYWORDS")
            .map(|raw| parse_keywords(&raw))
            .unwrap_or_default();

        let summary = SummaryConfig {
            api_key: std::env::var("OPENAI_KEY").unwrap_or_default(),
            prompt: std::env::var("OPENAI_PROMPT").unwrap_or_else(|_| DEFAULT_PROMPT.to_string()),
            model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string()),
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
        };

        let telegram = match std::env::var("TELEGRAM_BOT_TOKEN") {
            Ok(bot_token) => Some(TelegramConfig {
                api_url: std::env::var("TELEGRAM_API_URL")
                    .unwrap_or_else(|_| channels::DEFAULT_API_URL.to_string()),
                bot_token,
                channel_id: std::env::var("TELEGRAM_CHANNEL_ID").map_err(|_| {
                    FeederError::MissingEnvVar("TELEGRAM_CHANNEL_ID".to_string())
                })?,
            }),
            Err(_) => None,
        };

        let config = Self {
            db_path,
            fetch_interval,
            notification_interval,
            freshness_multiplier,
            filter_keywords,
            summary,
            telegram,
        };
        config.freshness_window()?;

        Ok(config)
    }

    /// The Telegram settings, required when the bot is started
    pub fn telegram(&self) -> FeederResult<&TelegramConfig> {
        self.telegram
            .as_ref()
            .ok_or_else(|| FeederError::MissingEnvVar("TELEGRAM_BOT_TOKEN".to_string()))
    }

    /// Maximum age of an unpublished article that may still be posted
    pub fn freshness_window(&self) -> FeederResult<Duration> {
        self.fetch_interval
            .checked_mul(self.freshness_multiplier)
            .ok_or_else(|| {
                FeederError::Config(
                    "FETCH_INTERVAL times FRESHNESS_MULTIPLIER is too large".to_string(),
                )
            })
    }
}

fn duration_var(name: &str, default: Duration) -> FeederResult<Duration> {
    match std::env::var(name) {
        Ok(raw) => parse_duration(&raw)
            .ok_or_else(|| FeederError::Config(format!("{} is not a valid duration: {}", name, raw))),
        Err(_) => Ok(default),
    }
}

/// Parse `90`, `90s`, `15m` or `2h` into a duration
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (number, unit) = match raw.find(|c: char| !c.is_ascii_digit()) {
        Some(pos) => raw.split_at(pos),
        None => (raw, "s"),
    };

    let value: u64 = number.parse().ok()?;
    let seconds = match unit.trim() {
        "s" => value,
        "m" => value.checked_mul(60)?,
        "h" => value.checked_mul(3600)?,
        _ => return None,
    };

    (seconds > 0).then(|| Duration::from_secs(seconds))
}

/// A freshness multiplier of zero would never let anything through
pub fn parse_multiplier(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|m| *m > 0)
}

/// Split a comma separated keyword list, dropping blanks
pub fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}
