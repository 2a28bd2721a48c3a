//! Job trait and supporting types
//!
//! A job is a scripted, long-running behavior that exercises one area of siad.
//! It runs until its [`JobContext`] is cancelled, treating every API failure
//! as transient.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::{Currency, SiadClient, SiadResult};
use crate::utils::{Backoff, sleep_or_cancel};

/// Pacing of a job's main loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOptions {
    /// Delay between iterations
    pub interval: Duration,
    /// First delay after a failed API call
    pub retry_delay: Duration,
    /// Cap on the failure backoff
    pub max_backoff: Duration,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            retry_delay: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
        }
    }
}

/// Everything a running job may touch
///
/// The client and wallet credential are shared read-only between all jobs of
/// one runner.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub client: Arc<SiadClient>,
    wallet_password: Arc<str>,
    /// Identifies the runner in logs (the ant's data directory)
    pub label: Arc<str>,
    pub cancel: CancellationToken,
    pub opts: JobOptions,
}

impl JobContext {
    pub fn new(
        client: Arc<SiadClient>,
        wallet_password: Arc<str>,
        label: Arc<str>,
        cancel: CancellationToken,
        opts: JobOptions,
    ) -> Self {
        Self {
            client,
            wallet_password,
            label,
            cancel,
            opts,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Sleep unless cancelled; `false` means the job should return
    pub async fn sleep(&self, duration: Duration) -> bool {
        sleep_or_cancel(&self.cancel, duration).await
    }

    /// Wait one loop interval; `false` means the job should return
    pub async fn tick(&self) -> bool {
        self.sleep(self.opts.interval).await
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.opts.retry_delay, self.opts.max_backoff)
    }

    /// Drive `fut` unless cancelled first
    pub async fn call<T>(&self, fut: impl Future<Output = T>) -> Option<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            out = fut => Some(out),
        }
    }

    /// Repeat an API call until it succeeds
    ///
    /// Failures are logged and backed off. Returns `None` only when the job
    /// was cancelled.
    pub async fn retry<T, F, Fut>(&self, action: &str, mut op: F) -> Option<T>
    where
        F: FnMut(Arc<SiadClient>) -> Fut,
        Fut: Future<Output = SiadResult<T>>,
    {
        let mut backoff = self.backoff();
        loop {
            match self.call(op(self.client.clone())).await? {
                Ok(value) => return Some(value),
                Err(e) => {
                    let delay = backoff.next_delay();
                    warn!(
                        action,
                        attempt = backoff.attempts(),
                        retry_in_ms = delay.as_millis(),
                        error = %e,
                        "API call failed"
                    );
                    if !self.sleep(delay).await {
                        return None;
                    }
                }
            }
        }
    }

    /// Make sure the wallet is unlocked
    ///
    /// Several jobs race to unlock the same wallet, so a failed unlock is
    /// only retried while the wallet still reports itself locked.
    pub async fn ensure_wallet_unlocked(&self) -> Option<()> {
        let mut backoff = self.backoff();
        loop {
            let wallet = self.retry("read wallet", |c| async move { c.wallet().await }).await?;
            if wallet.unlocked {
                return Some(());
            }

            match self.call(self.client.wallet_unlock(&self.wallet_password)).await? {
                Ok(()) => {
                    debug!("Wallet unlocked");
                    return Some(());
                }
                Err(e) => {
                    warn!(error = %e, "Failed to unlock wallet");
                    if !self.sleep(backoff.next_delay()).await {
                        return None;
                    }
                }
            }
        }
    }

    /// Block until the confirmed balance reaches `min`
    pub async fn wait_for_balance(&self, min: Currency) -> Option<Currency> {
        loop {
            let wallet = self.retry("read wallet", |c| async move { c.wallet().await }).await?;
            if wallet.confirmedsiacoinbalance >= min {
                return Some(wallet.confirmedsiacoinbalance);
            }
            debug!(
                balance = %wallet.confirmedsiacoinbalance,
                required = %min,
                "Waiting for funds"
            );
            if !self.tick().await {
                return None;
            }
        }
    }
}

/// Trait for scripted ant behaviors
///
/// Jobs are registered in the `JOBS` registry and launched by name.
///
/// A job must:
/// - loop until `ctx.cancel` fires, awaiting only through `ctx` helpers so
///   that cancellation is observed at every blocking point
/// - treat API errors as soft failures (log, back off, retry)
/// - return promptly once cancelled
///
/// ## Example Implementation
///
/// ```ignore
/// use async_trait::async_trait;
/// use sia_ant::jobs::{Job, JobContext};
///
/// pub struct HeightLogger;
///
/// #[async_trait]
/// impl Job for HeightLogger {
///     fn name(&self) -> &'static str { "heightlogger" }
///     fn description(&self) -> &'static str { "Logs the block height" }
///
///     async fn run(&self, ctx: JobContext) {
///         while let Some(c) = ctx.retry("consensus", |c| async move { c.consensus().await }).await {
///             tracing::info!(height = c.height, "Height");
///             if !ctx.tick().await { break; }
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Job: Send + Sync {
    /// Unique name for this job (used in config and on the CLI)
    fn name(&self) -> &'static str;

    /// Human-readable description
    fn description(&self) -> &'static str;

    /// Run until cancelled
    async fn run(&self, ctx: JobContext);

    /// Default pacing for this job
    fn default_options(&self) -> JobOptions {
        JobOptions::default()
    }
}
