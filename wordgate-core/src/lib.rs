pub mod config;
pub mod leaderboard;
pub mod verification;
pub mod words;

pub use config::{
    Config, ConfigError, DiscordIds, MessageTemplates, ReconnectSettings, Secrets, SecretsError,
    Settings, SettingsError, StorageSettings, load_dotenv,
};
pub use leaderboard::{LeaderboardEntry, LeaderboardError, LeaderboardStore};
pub use verification::{
    PendingVerification, Resolution, SideEffect, VerificationError, VerificationGate,
    VerificationState,
};
pub use words::{WordMatcher, WordsError};
