//! Non-secret settings loaded from environment variables.
//!
//! Snowflake ids are required; message templates, storage paths and the
//! reconnect policy fall back to defaults.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_LEADERBOARD_PATH: &str = "leaderboard.json";
const DEFAULT_WORDS_PATH: &str = "words.json";
const DEFAULT_RECONNECT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_RECONNECT_BASE_DELAY_SECS: u64 = 5;
const DEFAULT_RECONNECT_MAX_DELAY_SECS: u64 = 300;

/// Discord snowflakes the bot works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscordIds {
    pub guild_id: u64,
    pub verification_channel_id: u64,
    pub leaderboard_channel_id: u64,
    pub rules_channel_id: u64,
    pub unverified_role_id: u64,
    pub owner_id: u64,
}

/// Text templates sent by the bot. Opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplates {
    pub ping: String,
    pub permission_denied: String,
    pub welcome: Vec<String>,
    pub verification: String,
    pub congratulations: String,
    pub leaderboard_title: String,
    pub rules: String,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self {
            ping: "Pong!".to_string(),
            permission_denied: "You do not have permission to do that.".to_string(),
            welcome: vec![
                "Welcome to the server!".to_string(),
                "Reply to this message to introduce yourself; a moderator will verify you shortly."
                    .to_string(),
            ],
            verification: "Thanks! A moderator will review your request.".to_string(),
            congratulations: "to find a secret word!".to_string(),
            leaderboard_title: "Leaderboard".to_string(),
            rules: "Be kind.".to_string(),
        }
    }
}

/// File locations for persisted state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    pub leaderboard_path: PathBuf,
    pub words_path: PathBuf,
}

/// Retry policy for the gateway connection when rate limited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectSettings {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RECONNECT_MAX_ATTEMPTS,
            base_delay: Duration::from_secs(DEFAULT_RECONNECT_BASE_DELAY_SECS),
            max_delay: Duration::from_secs(DEFAULT_RECONNECT_MAX_DELAY_SECS),
        }
    }
}

/// All non-secret settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub ids: DiscordIds,
    pub messages: MessageTemplates,
    pub storage: StorageSettings,
    pub reconnect: ReconnectSettings,
}

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Environment variable {name} is not a valid id: {value:?}")]
    InvalidId { name: String, value: String },

    #[error("Environment variable {name} is not a valid number: {value:?}")]
    InvalidNumber { name: String, value: String },
}

impl Settings {
    /// Build settings from an arbitrary key lookup (usually `std::env::var`).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ids = DiscordIds {
            guild_id: required_id(&lookup, "GUILD_ID")?,
            verification_channel_id: required_id(&lookup, "VERIFICATION_CHANNEL_ID")?,
            leaderboard_channel_id: required_id(&lookup, "LEADERBOARD_CHANNEL_ID")?,
            rules_channel_id: required_id(&lookup, "RULES_CHANNEL_ID")?,
            unverified_role_id: required_id(&lookup, "UNVERIFIED_ROLE_ID")?,
            owner_id: required_id(&lookup, "OWNER_ID")?,
        };

        let defaults = MessageTemplates::default();
        let text = |key: &str, fallback: &str| lookup(key).unwrap_or_else(|| fallback.to_string());
        let welcome = match (lookup("WELCOME_MESSAGE_1"), lookup("WELCOME_MESSAGE_2")) {
            (None, None) => defaults.welcome.clone(),
            (first, second) => first.into_iter().chain(second).collect(),
        };
        let messages = MessageTemplates {
            ping: text("PING_MESSAGE", &defaults.ping),
            permission_denied: text("PERMISSION_MESSAGE", &defaults.permission_denied),
            welcome,
            verification: text("VERIFICATION_MESSAGE", &defaults.verification),
            congratulations: text("CONGRATULATIONS_MESSAGE", &defaults.congratulations),
            leaderboard_title: text("LEADERBOARD_TITLE", &defaults.leaderboard_title),
            rules: text("RULES", &defaults.rules),
        };

        let storage = StorageSettings {
            leaderboard_path: PathBuf::from(text("LEADERBOARD_PATH", DEFAULT_LEADERBOARD_PATH)),
            words_path: PathBuf::from(text("WORDS_PATH", DEFAULT_WORDS_PATH)),
        };

        let reconnect = ReconnectSettings {
            max_attempts: optional_number(
                &lookup,
                "RECONNECT_MAX_ATTEMPTS",
                DEFAULT_RECONNECT_MAX_ATTEMPTS,
            )?,
            base_delay: Duration::from_secs(optional_number(
                &lookup,
                "RECONNECT_BASE_DELAY_SECS",
                DEFAULT_RECONNECT_BASE_DELAY_SECS,
            )?),
            max_delay: Duration::from_secs(optional_number(
                &lookup,
                "RECONNECT_MAX_DELAY_SECS",
                DEFAULT_RECONNECT_MAX_DELAY_SECS,
            )?),
        };

        Ok(Self {
            ids,
            messages,
            storage,
            reconnect,
        })
    }
}

fn required_id<F>(lookup: &F, name: &str) -> Result<u64, SettingsError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(name).ok_or_else(|| SettingsError::MissingVar(name.to_string()))?;
    match value.trim().parse::<u64>() {
        Ok(id) if id != 0 => Ok(id),
        _ => Err(SettingsError::InvalidId {
            name: name.to_string(),
            value,
        }),
    }
}

fn optional_number<F, N>(lookup: &F, name: &str, default: N) -> Result<N, SettingsError>
where
    F: Fn(&str) -> Option<String>,
    N: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<N>()
            .map_err(|_| SettingsError::InvalidNumber {
                name: name.to_string(),
                value,
            }),
    }
}
