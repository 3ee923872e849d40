//! Configuration management for wordgate.
//!
//! Secrets and settings both come from the environment (optionally seeded
//! from a `.env` file), but are kept in separate types so the token never
//! ends up in logs next to ordinary settings.
//!
//! # Environment
//!
//! ## Secrets
//! - `DISCORD_BOT_TOKEN`
//!
//! ## Settings
//! - `GUILD_ID`, `VERIFICATION_CHANNEL_ID`, `LEADERBOARD_CHANNEL_ID`,
//!   `RULES_CHANNEL_ID`, `UNVERIFIED_ROLE_ID`, `OWNER_ID` (required)
//! - `PING_MESSAGE`, `PERMISSION_MESSAGE`, `WELCOME_MESSAGE_1`,
//!   `WELCOME_MESSAGE_2`, `VERIFICATION_MESSAGE`, `CONGRATULATIONS_MESSAGE`,
//!   `LEADERBOARD_TITLE`, `RULES`
//! - `LEADERBOARD_PATH`, `WORDS_PATH`
//! - `RECONNECT_MAX_ATTEMPTS`, `RECONNECT_BASE_DELAY_SECS`,
//!   `RECONNECT_MAX_DELAY_SECS`

mod secrets;
mod settings;

use std::env;

pub use secrets::{Secrets, SecretsError};
pub use settings::{
    DiscordIds, MessageTemplates, ReconnectSettings, Settings, SettingsError, StorageSettings,
};

/// Load .env file if it exists.
pub fn load_dotenv() {
    // Silently ignore errors (file might not exist)
    let _ = dotenvy::dotenv();
}

/// Combined configuration containing both secrets and settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub secrets: Secrets,
    pub settings: Settings,
}

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Secrets error: {0}")]
    Secrets(#[from] SecretsError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secrets = Secrets::from_lookup(&lookup)?;
        let settings = Settings::from_lookup(&lookup)?;
        Ok(Self { secrets, settings })
    }

    pub fn discord_bot_token(&self) -> &str {
        &self.secrets.discord_bot_token
    }

    /// Whether `user_id` is the configured owner.
    pub fn is_owner(&self, user_id: u64) -> bool {
        self.settings.ids.owner_id == user_id
    }
}
