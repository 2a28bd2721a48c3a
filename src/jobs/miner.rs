//! Miner Job
//!
//! Mines blocks with siad's CPU miner and checks that mining pays out.
//!
//! ## What it does
//!
//! 1. Unlocks the wallet
//! 2. Starts the CPU miner (`GET /miner/start`)
//! 3. Every interval, verifies the confirmed balance has grown; logs an
//!    error when it has not

use async_trait::async_trait;
use std::time::Duration;
use tracing::{error, info};

use super::traits::{Job, JobContext, JobOptions};

/// Block mining job
pub struct MinerJob;

#[async_trait]
impl Job for MinerJob {
    fn name(&self) -> &'static str {
        "miner"
    }

    fn description(&self) -> &'static str {
        "Mine blocks and verify the wallet receives block rewards"
    }

    async fn run(&self, ctx: JobContext) {
        if ctx.ensure_wallet_unlocked().await.is_none() {
            return;
        }
        if ctx
            .retry("start miner", |c| async move { c.miner_start().await })
            .await
            .is_none()
        {
            return;
        }
        info!("Miner started");

        let Some(wallet) = ctx
            .retry("read wallet", |c| async move { c.wallet().await })
            .await
        else {
            return;
        };
        let mut last_balance = wallet.confirmedsiacoinbalance;

        while ctx.tick().await {
            let Some(wallet) = ctx
                .retry("read wallet", |c| async move { c.wallet().await })
                .await
            else {
                return;
            };

            let balance = wallet.confirmedsiacoinbalance;
            if balance > last_balance {
                info!(balance = %balance, "Mining increased balance");
            } else {
                error!(
                    balance = %balance,
                    interval_secs = ctx.opts.interval.as_secs(),
                    "Balance did not increase while mining"
                );
            }
            last_balance = balance;
        }
    }

    fn default_options(&self) -> JobOptions {
        JobOptions {
            interval: Duration::from_secs(100),
            ..JobOptions::default()
        }
    }
}
