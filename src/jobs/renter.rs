//! Renter Job
//!
//! Rents storage from the hosts on the network.
//!
//! ## What it does
//!
//! 1. Unlocks the wallet and waits until it can fund an allowance
//! 2. Sets an allowance, which makes siad form contracts with hosts
//! 3. Periodically checks the contract set; when it is empty the allowance
//!    is posted again so siad retries contract formation
//!
//! ## Options
//!
//! - `interval`: delay between contract checks (default: 60s)

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::traits::{Job, JobContext, JobOptions};
use crate::client::{Allowance, Currency};

const RENTER_ALLOWANCE: Allowance = Allowance {
    funds: Currency::siacoins(2_000),
    hosts: 1,
    period: 100,
    renewwindow: 50,
};

/// Storage renter job
pub struct RenterJob;

async fn set_allowance(ctx: &JobContext) -> Option<()> {
    ctx.retry("set allowance", |c| async move {
        c.renter_set_allowance(&RENTER_ALLOWANCE).await
    })
    .await
}

#[async_trait]
impl Job for RenterJob {
    fn name(&self) -> &'static str {
        "renter"
    }

    fn description(&self) -> &'static str {
        "Set an allowance and keep storage contracts formed"
    }

    async fn run(&self, ctx: JobContext) {
        if ctx.ensure_wallet_unlocked().await.is_none() {
            return;
        }
        if ctx.wait_for_balance(RENTER_ALLOWANCE.funds).await.is_none() {
            return;
        }
        if set_allowance(&ctx).await.is_none() {
            return;
        }
        info!(
            funds = %RENTER_ALLOWANCE.funds,
            hosts = RENTER_ALLOWANCE.hosts,
            period = RENTER_ALLOWANCE.period,
            "Allowance set"
        );

        while ctx.tick().await {
            let Some(contracts) = ctx
                .retry("read contracts", |c| async move { c.renter_contracts().await })
                .await
            else {
                return;
            };

            if contracts.count() == 0 {
                warn!("Renter holds no contracts, posting allowance again");
                if set_allowance(&ctx).await.is_none() {
                    return;
                }
            } else {
                debug!(contracts = contracts.count(), "Renter contracts");
            }
        }
    }

    fn default_options(&self) -> JobOptions {
        JobOptions {
            interval: Duration::from_secs(60),
            ..JobOptions::default()
        }
    }
}
