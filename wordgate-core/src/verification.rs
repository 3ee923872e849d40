//! Manual verification of new members.
//!
//! Each direct message from a restricted member opens a
//! [`PendingVerification`]. A moderator resolves it once, by approving
//! (the restricted role is lifted) or denying (nothing changes). Resolved
//! decisions are terminal; acting on them again is a silent no-op.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationState {
    Open,
    Approved,
    Denied,
}

impl VerificationState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Open)
    }
}

/// A decision waiting for (or resolved by) a moderator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingVerification {
    /// Id of the direct message that opened the decision.
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub content: String,
    pub state: VerificationState,
    pub opened_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl PendingVerification {
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            user_name: user_name.into(),
            content: content.into(),
            state: VerificationState::Open,
            opened_at: Utc::now(),
            resolved_at: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.state.is_terminal()
    }
}

/// What the platform layer has to do after a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    RemoveRestrictedRole { user_id: String },
}

/// Outcome of an approve/deny call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The decision moved out of `Open` with this call.
    Applied(PendingVerification),
    /// The decision was already resolved; nothing changed.
    Unchanged(PendingVerification),
}

impl Resolution {
    pub fn pending(&self) -> &PendingVerification {
        match self {
            Self::Applied(p) | Self::Unchanged(p) => p,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    /// The side effect to perform, if any. Only a fresh approval has one.
    pub fn side_effect(&self) -> Option<SideEffect> {
        match self {
            Self::Applied(p) if p.state == VerificationState::Approved => {
                Some(SideEffect::RemoveRestrictedRole {
                    user_id: p.user_id.clone(),
                })
            }
            _ => None,
        }
    }
}

/// Verification errors
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("Unknown verification request: {0}")]
    Unknown(String),
}

/// Resolved decisions kept around so late clicks stay no-ops.
pub const DEFAULT_RESOLVED_RETENTION: usize = 1024;

/// Open decisions plus the most recently resolved ones.
///
/// Open decisions are never dropped. Once more than `resolved_retention`
/// decisions are resolved, the oldest resolved ones are forgotten and
/// acting on them reports [`VerificationError::Unknown`].
#[derive(Debug)]
pub struct VerificationGate {
    pending: HashMap<String, PendingVerification>,
    resolved: VecDeque<String>,
    resolved_retention: usize,
}

impl Default for VerificationGate {
    fn default() -> Self {
        Self::with_resolved_retention(DEFAULT_RESOLVED_RETENTION)
    }
}

impl VerificationGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resolved_retention(resolved_retention: usize) -> Self {
        Self {
            pending: HashMap::new(),
            resolved: VecDeque::new(),
            resolved_retention,
        }
    }

    /// Open a decision for a direct message. Messages are never merged:
    /// two DMs from one user give two decisions.
    pub fn on_direct_message(
        &mut self,
        message_id: impl Into<String>,
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        content: impl Into<String>,
    ) -> PendingVerification {
        let pending = PendingVerification::new(message_id, user_id, user_name, content);
        self.pending.insert(pending.id.clone(), pending.clone());
        pending
    }

    pub fn approve(&mut self, message_id: &str) -> Result<Resolution, VerificationError> {
        self.resolve(message_id, VerificationState::Approved)
    }

    pub fn deny(&mut self, message_id: &str) -> Result<Resolution, VerificationError> {
        self.resolve(message_id, VerificationState::Denied)
    }

    fn resolve(
        &mut self,
        message_id: &str,
        outcome: VerificationState,
    ) -> Result<Resolution, VerificationError> {
        let pending = self
            .pending
            .get_mut(message_id)
            .ok_or_else(|| VerificationError::Unknown(message_id.to_string()))?;

        if pending.is_resolved() {
            return Ok(Resolution::Unchanged(pending.clone()));
        }

        pending.state = outcome;
        pending.resolved_at = Some(Utc::now());
        let resolution = Resolution::Applied(pending.clone());

        self.resolved.push_back(message_id.to_string());
        while self.resolved.len() > self.resolved_retention {
            if let Some(oldest) = self.resolved.pop_front() {
                self.pending.remove(&oldest);
            }
        }
        Ok(resolution)
    }

    pub fn get(&self, message_id: &str) -> Option<&PendingVerification> {
        self.pending.get(message_id)
    }

    /// Number of decisions still waiting for a moderator.
    pub fn open_count(&self) -> usize {
        self.pending.values().filter(|p| !p.is_resolved()).count()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
