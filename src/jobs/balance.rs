//! Balance maintainer
//!
//! Keeps the wallet's confirmed balance at or above a target by toggling the
//! CPU miner: mining while below the target, idle once it is reached.
//!
//! Not registered by name; the ant launches it whenever a non-zero desired
//! currency is configured.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

use super::traits::{Job, JobContext, JobOptions};
use crate::client::Currency;

/// Mines until the wallet holds `desired` hastings
pub struct BalanceMaintainer {
    desired: Currency,
}

impl BalanceMaintainer {
    pub fn new(desired: Currency) -> Self {
        Self { desired }
    }

    pub fn desired(&self) -> Currency {
        self.desired
    }
}

#[async_trait]
impl Job for BalanceMaintainer {
    fn name(&self) -> &'static str {
        "balance"
    }

    fn description(&self) -> &'static str {
        "Mine whenever the wallet balance drops below the desired amount"
    }

    async fn run(&self, ctx: JobContext) {
        if ctx.ensure_wallet_unlocked().await.is_none() {
            return;
        }

        loop {
            let Some(wallet) = ctx
                .retry("read wallet", |c| async move { c.wallet().await })
                .await
            else {
                return;
            };
            let balance = wallet.confirmedsiacoinbalance;

            // The miner may be toggled by other jobs, so ask siad each round
            let Some(miner) = ctx
                .retry("read miner", |c| async move { c.miner().await })
                .await
            else {
                return;
            };
            let mining = miner.cpumining;

            if balance < self.desired && !mining {
                if ctx
                    .retry("start miner", |c| async move { c.miner_start().await })
                    .await
                    .is_none()
                {
                    return;
                }
                info!(balance = %balance, desired = %self.desired, "Balance below target, mining");
            } else if balance >= self.desired && mining {
                if ctx
                    .retry("stop miner", |c| async move { c.miner_stop().await })
                    .await
                    .is_none()
                {
                    return;
                }
                info!(balance = %balance, desired = %self.desired, "Balance target reached, miner stopped");
            } else {
                debug!(balance = %balance, mining, "Balance unchanged");
            }

            if !ctx.tick().await {
                return;
            }
        }
    }

    fn default_options(&self) -> JobOptions {
        JobOptions {
            interval: Duration::from_secs(20),
            ..JobOptions::default()
        }
    }
}
