//! Leaderboard store: per-user counts of qualifying messages.
//!
//! Counts live in memory for the lifetime of the process and are written to
//! disk wholesale on shutdown. Entries keep the order in which users first
//! scored; rendering is not a ranking.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use serde_json::{Map, Value};
use tracing::{debug, info};

/// A single user's count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub count: u64,
}

#[derive(Debug, Default)]
struct Entries {
    ordered: Vec<LeaderboardEntry>,
    index: HashMap<String, usize>,
}

impl Entries {
    fn bump(&mut self, user_id: &str) -> u64 {
        if let Some(&slot) = self.index.get(user_id) {
            let entry = &mut self.ordered[slot];
            // Counts never wrap back down
            entry.count = entry.count.saturating_add(1);
            return entry.count;
        }

        self.index.insert(user_id.to_string(), self.ordered.len());
        self.ordered.push(LeaderboardEntry {
            user_id: user_id.to_string(),
            count: 1,
        });
        1
    }
}

/// Thread-safe leaderboard.
///
/// Every mutation takes the same lock, so concurrent increments for one user
/// are serialized and never lost.
#[derive(Debug, Default)]
pub struct LeaderboardStore {
    entries: Mutex<Entries>,
}

impl LeaderboardStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from `(user_id, count)` pairs, keeping their order.
    ///
    /// A repeated user id keeps its first position and its last count.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let mut inner = Entries::default();
        for (user_id, count) in entries {
            let user_id = user_id.into();
            match inner.index.get(&user_id) {
                Some(&slot) => inner.ordered[slot].count = count,
                None => {
                    inner.index.insert(user_id.clone(), inner.ordered.len());
                    inner.ordered.push(LeaderboardEntry { user_id, count });
                }
            }
        }
        Self {
            entries: Mutex::new(inner),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        // A panic while holding the lock cannot leave a half-written entry,
        // so the data is still usable.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add one to `user_id`'s count and return the new total.
    pub fn increment(&self, user_id: &str) -> u64 {
        let count = self.lock().bump(user_id);
        debug!(user_id, count, "Leaderboard incremented");
        count
    }

    /// Current count for `user_id` (0 if the user never scored).
    pub fn get(&self, user_id: &str) -> u64 {
        let entries = self.lock();
        entries
            .index
            .get(user_id)
            .map(|&slot| entries.ordered[slot].count)
            .unwrap_or(0)
    }

    /// Snapshot of all entries in insertion order.
    pub fn entries(&self) -> Vec<LeaderboardEntry> {
        self.lock().ordered.clone()
    }

    /// Snapshot as `(user_id, count)` pairs in insertion order.
    pub fn render(&self) -> Vec<(String, u64)> {
        self.lock()
            .ordered
            .iter()
            .map(|e| (e.user_id.clone(), e.count))
            .collect()
    }

    /// One `<@user_id>: count` line per entry, each terminated by a newline.
    pub fn render_lines(&self) -> String {
        self.lock()
            .ordered
            .iter()
            .map(|e| format!("<@{}>: {}\n", e.user_id, e.count))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().ordered.is_empty()
    }

    /// Load a store from `path`.
    ///
    /// A missing or zero-byte file yields an empty store. Anything else that
    /// is not a JSON object of non-negative integers is an error; callers
    /// should treat it as fatal rather than start over with an empty board.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LeaderboardError> {
        let path = path.as_ref();

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No leaderboard at {}, starting empty", path.display());
                return Ok(Self::new());
            }
            Err(e) => return Err(e.into()),
        };

        if content.is_empty() {
            info!("Leaderboard at {} is empty, starting empty", path.display());
            return Ok(Self::new());
        }

        let store = Self::from_json(&content)?;
        info!(
            "Loaded leaderboard with {} entries from {}",
            store.len(),
            path.display()
        );
        Ok(store)
    }

    /// Parse the persisted `{ "<user_id>": <count> }` form.
    pub fn from_json(content: &str) -> Result<Self, LeaderboardError> {
        let value: Value = serde_json::from_str(content)?;
        let Value::Object(map) = value else {
            return Err(LeaderboardError::NotAnObject);
        };

        let mut pairs = Vec::with_capacity(map.len());
        for (user_id, count) in map {
            let count = count
                .as_u64()
                .ok_or_else(|| LeaderboardError::InvalidCount {
                    user_id: user_id.clone(),
                    value: count.to_string(),
                })?;
            pairs.push((user_id, count));
        }
        Ok(Self::from_entries(pairs))
    }

    /// Serialize to the persisted JSON object form.
    pub fn to_json(&self) -> String {
        let map: Map<String, Value> = self
            .lock()
            .ordered
            .iter()
            .map(|e| (e.user_id.clone(), Value::from(e.count)))
            .collect();
        Value::Object(map).to_string()
    }

    /// Write the whole store to `path`, replacing any previous content.
    ///
    /// The data goes to a sibling temporary file first and is then renamed
    /// over the target, so a crash mid-write leaves the old file intact.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), LeaderboardError> {
        let path = path.as_ref();
        let json = self.to_json();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        fs::write(&tmp_name, json)?;
        fs::rename(&tmp_name, path)?;

        info!("Saved leaderboard with {} entries to {}", self.len(), path.display());
        Ok(())
    }
}

impl PartialEq for LeaderboardStore {
    fn eq(&self, other: &Self) -> bool {
        self.entries() == other.entries()
    }
}

/// Leaderboard persistence errors
#[derive(Debug, thiserror::Error)]
pub enum LeaderboardError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Leaderboard file must contain a JSON object")]
    NotAnObject,
    #[error("Invalid count for user {user_id}: {value}")]
    InvalidCount { user_id: String, value: String },
}
