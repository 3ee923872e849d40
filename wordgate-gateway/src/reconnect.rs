//! Connection retry loop with exponential backoff.
//!
//! A session that ends because Discord is rate limiting us is retried after
//! a growing delay. Any other failure ends the loop at once. Either way the
//! outcome is returned to the caller, which decides how to shut down.

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};
use wordgate_core::ReconnectSettings;

/// Why a single connection attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionFailure {
    /// HTTP 429 from Discord; worth retrying later.
    RateLimited(String),
    /// Invalid token, missing intents, and the like.
    Fatal(String),
}

/// Why the retry loop gave up.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReconnectError {
    #[error("Still rate limited after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
    #[error("Discord connection failed: {0}")]
    Fatal(String),
}

/// Exponential backoff policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Backoff {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .checked_mul(1 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl From<ReconnectSettings> for Backoff {
    fn from(settings: ReconnectSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: settings.base_delay,
            max_delay: settings.max_delay,
        }
    }
}

/// Run `connect` until it succeeds, fails fatally, or stays rate limited
/// for `backoff.max_attempts` attempts. `connect` receives the 1-based
/// attempt number.
pub async fn run_with_backoff<F, Fut>(backoff: &Backoff, mut connect: F) -> Result<(), ReconnectError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<(), ConnectionFailure>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match connect(attempt).await {
            Ok(()) => {
                info!("Discord session ended after {} attempt(s)", attempt);
                return Ok(());
            }
            Err(ConnectionFailure::Fatal(reason)) => {
                return Err(ReconnectError::Fatal(reason));
            }
            Err(ConnectionFailure::RateLimited(reason)) => {
                if attempt >= backoff.max_attempts {
                    return Err(ReconnectError::RetriesExhausted {
                        attempts: attempt,
                        last: reason,
                    });
                }
                let delay = backoff.delay_for(attempt);
                warn!(
                    "We are being rate limited ({}), retrying in {:?} (attempt {}/{})",
                    reason, delay, attempt, backoff.max_attempts
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
