//! Retry pacing utilities
//!
//! Jobs treat every API failure as transient: they log, wait, and try again
//! until cancelled. This module provides the two pieces of that loop:
//!
//! - [`Backoff`] - capped exponential delay between consecutive failures
//! - [`sleep_or_cancel`] - a sleep that returns early when a
//!   [`CancellationToken`] fires
//!
//! ## Example
//!
//! ```ignore
//! let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(30));
//! loop {
//!     match client.wallet().await {
//!         Ok(_) => backoff.reset(),
//!         Err(e) => {
//!             warn!(error = %e, "Wallet query failed");
//!             if !sleep_or_cancel(&cancel, backoff.next_delay()).await {
//!                 return;
//!             }
//!         }
//!     }
//! }
//! ```

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Capped exponential backoff
///
/// The first delay equals `base`, each following delay doubles, never
/// exceeding `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            attempt: 0,
        }
    }

    /// Delay to wait before the next attempt, advancing the sequence
    pub fn next_delay(&mut self) -> Duration {
        let factor = 1u32.checked_shl(self.attempt).unwrap_or(u32::MAX);
        self.attempt = self.attempt.saturating_add(1);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Number of consecutive failures seen since the last reset
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Start over after a success
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// Sleep for `duration` unless `cancel` fires first
///
/// Returns `true` if the full duration elapsed, `false` if cancelled.
pub async fn sleep_or_cancel(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
