use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serenity::gateway::ShardManager;
use serenity::model::id::ShardId;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use wordgate_core::{
    Config, LeaderboardError, LeaderboardStore, PendingVerification, Resolution,
    VerificationError, VerificationGate, WordMatcher, WordsError,
};

/// Errors that stop the bot before it connects.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Failed to load secret words: {0}")]
    Words(#[from] WordsError),
    #[error("Failed to load leaderboard: {0}")]
    Leaderboard(#[from] LeaderboardError),
}

/// Shared application state, built once by `main` and handed to the
/// Discord handler.
pub struct AppState {
    pub config: Config,
    pub words: WordMatcher,
    pub leaderboard: LeaderboardStore,
    verification: Mutex<VerificationGate>,
    /// Shard manager of the current client, for heartbeat latency.
    shard_manager: RwLock<Option<Arc<ShardManager>>>,
    persisted: AtomicBool,
}

impl AppState {
    pub fn new(config: Config, words: WordMatcher, leaderboard: LeaderboardStore) -> Self {
        Self {
            config,
            words,
            leaderboard,
            verification: Mutex::new(VerificationGate::new()),
            shard_manager: RwLock::new(None),
            persisted: AtomicBool::new(false),
        }
    }

    /// Load the secret words and the leaderboard from the configured paths.
    pub fn load(config: Config) -> Result<Self, StartupError> {
        let storage = &config.settings.storage;
        let words = WordMatcher::load(&storage.words_path)?;
        let leaderboard = LeaderboardStore::load(&storage.leaderboard_path)?;
        Ok(Self::new(config, words, leaderboard))
    }

    /// Count a guild message. Returns the author's new total when the
    /// message contains a secret word.
    pub fn record_message(&self, user_id: &str, content: &str) -> Option<u64> {
        if !self.words.matches(content) {
            return None;
        }
        let count = self.leaderboard.increment(user_id);
        info!(user_id, count, "Secret word found");
        Some(count)
    }

    pub async fn open_verification(
        &self,
        message_id: &str,
        user_id: &str,
        user_name: &str,
        content: &str,
    ) -> PendingVerification {
        let pending = self
            .verification
            .lock()
            .await
            .on_direct_message(message_id, user_id, user_name, content);
        info!(
            "Verification {} opened for {} ({})",
            pending.id, pending.user_name, pending.user_id
        );
        pending
    }

    pub async fn approve_verification(
        &self,
        message_id: &str,
    ) -> Result<Resolution, VerificationError> {
        let resolution = self.verification.lock().await.approve(message_id)?;
        log_resolution("approved", &resolution);
        Ok(resolution)
    }

    pub async fn deny_verification(
        &self,
        message_id: &str,
    ) -> Result<Resolution, VerificationError> {
        let resolution = self.verification.lock().await.deny(message_id)?;
        log_resolution("denied", &resolution);
        Ok(resolution)
    }

    pub async fn open_verification_count(&self) -> usize {
        self.verification.lock().await.open_count()
    }

    pub async fn set_shard_manager(&self, manager: Arc<ShardManager>) {
        *self.shard_manager.write().await = Some(manager);
    }

    /// Last measured heartbeat latency of `shard_id`, if known.
    pub async fn shard_latency(&self, shard_id: ShardId) -> Option<Duration> {
        let manager = self.shard_manager.read().await.clone()?;
        let runners = manager.runners.lock().await;
        runners.get(&shard_id).and_then(|runner| runner.latency)
    }

    /// Write the leaderboard to disk. Only the first call does anything;
    /// later calls return `Ok(false)`.
    pub fn persist(&self) -> Result<bool, LeaderboardError> {
        if self.persisted.swap(true, Ordering::SeqCst) {
            debug!("Leaderboard already persisted");
            return Ok(false);
        }
        info!("Serializing leaderboard: {}", self.leaderboard.to_json());
        self.leaderboard
            .save(&self.config.settings.storage.leaderboard_path)?;
        Ok(true)
    }
}

fn log_resolution(action: &str, resolution: &Resolution) {
    let pending = resolution.pending();
    if resolution.was_applied() {
        info!(
            "Verification {} {} for {} ({})",
            pending.id, action, pending.user_name, pending.user_id
        );
    } else {
        debug!(
            "Verification {} already resolved as {:?}, ignoring",
            pending.id, pending.state
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wordgate_core::{SideEffect, VerificationState};

    /// "pizza"
    const PIZZA_B64: &str = "cGl6emE=";

    fn test_config(dir: &std::path::Path) -> Config {
        let leaderboard = dir.join("leaderboard.json").display().to_string();
        let words = dir.join("words.json").display().to_string();
        let vars: Vec<(&str, String)> = vec![
            ("DISCORD_BOT_TOKEN", "token".into()),
            ("GUILD_ID", "1".into()),
            ("VERIFICATION_CHANNEL_ID", "2".into()),
            ("LEADERBOARD_CHANNEL_ID", "3".into()),
            ("RULES_CHANNEL_ID", "4".into()),
            ("UNVERIFIED_ROLE_ID", "5".into()),
            ("OWNER_ID", "6".into()),
            ("LEADERBOARD_PATH", leaderboard),
            ("WORDS_PATH", words),
        ];
        Config::from_lookup(|key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.clone())
        })
        .unwrap()
    }

    fn test_state(dir: &std::path::Path) -> AppState {
        AppState::new(
            test_config(dir),
            WordMatcher::decode([PIZZA_B64]).unwrap(),
            LeaderboardStore::new(),
        )
    }

    #[test]
    fn test_record_message_counts_only_matches() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        assert_eq!(state.record_message("42", "hello"), None);
        assert_eq!(state.record_message("42", "pizza time"), Some(1));
        assert_eq!(state.record_message("42", "more pizza"), Some(2));
        assert_eq!(state.leaderboard.get("42"), 2);
    }

    #[test]
    fn test_persist_runs_once() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        state.record_message("42", "pizza");

        assert!(state.persist().unwrap());
        state.record_message("42", "pizza");
        assert!(!state.persist().unwrap());

        let saved = std::fs::read_to_string(dir.path().join("leaderboard.json")).unwrap();
        assert_eq!(saved, r#"{"42":1}"#);
    }

    #[test]
    fn test_load_fails_without_words_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = AppState::load(test_config(dir.path()));
        assert!(matches!(result, Err(StartupError::Words(_))));
    }

    #[tokio::test]
    async fn test_verification_flow() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        state.open_verification("m1", "42", "alice", "hi").await;
        assert_eq!(state.open_verification_count().await, 1);

        let approved = state.approve_verification("m1").await.unwrap();
        assert_eq!(
            approved.side_effect(),
            Some(SideEffect::RemoveRestrictedRole {
                user_id: "42".into()
            })
        );

        let denied = state.deny_verification("m1").await.unwrap();
        assert!(!denied.was_applied());
        assert_eq!(denied.pending().state, VerificationState::Approved);
        assert_eq!(state.open_verification_count().await, 0);
    }

    #[tokio::test]
    async fn test_latency_unknown_without_client() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        assert_eq!(state.shard_latency(ShardId(0)).await, None);
    }
}
