//! Host Job
//!
//! Turns the ant into a storage host.
//!
//! ## What it does
//!
//! 1. Unlocks the wallet and waits for enough funds to post collateral
//! 2. Adds a storage folder inside the ant's data directory
//! 3. Starts accepting contracts and announces the host on chain
//! 4. Periodically reports the number of storage contracts held
//!
//! ## Options
//!
//! - `interval`: delay between contract reports (default: 60s)

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use super::traits::{Job, JobContext, JobOptions};
use crate::client::Currency;

/// Funds required before announcing (collateral plus fees)
const HOST_MIN_FUNDS: Currency = Currency::siacoins(5_000);

/// Size of the storage folder offered to renters (1 GiB)
const STORAGE_FOLDER_SIZE: u64 = 1 << 30;

/// Storage host job
pub struct HostJob;

impl HostJob {
    fn storage_folder(label: &str) -> String {
        Path::new(label)
            .join("hoststorage")
            .to_string_lossy()
            .into_owned()
    }
}

#[async_trait]
impl Job for HostJob {
    fn name(&self) -> &'static str {
        "host"
    }

    fn description(&self) -> &'static str {
        "Announce as a storage host and accept contracts"
    }

    async fn run(&self, ctx: JobContext) {
        if ctx.ensure_wallet_unlocked().await.is_none() {
            return;
        }
        let Some(balance) = ctx.wait_for_balance(HOST_MIN_FUNDS).await else {
            return;
        };
        debug!(balance = %balance, "Host funded");

        let folder = Self::storage_folder(&ctx.label);
        let added = ctx
            .retry("add storage folder", |c| {
                let folder = folder.clone();
                async move { c.host_add_storage_folder(&folder, STORAGE_FOLDER_SIZE).await }
            })
            .await;
        if added.is_none() {
            return;
        }

        if ctx
            .retry("accept contracts", |c| async move {
                c.host_accept_contracts(true).await
            })
            .await
            .is_none()
        {
            return;
        }

        if ctx
            .retry("announce host", |c| async move { c.host_announce().await })
            .await
            .is_none()
        {
            return;
        }
        info!(folder = %folder, "Host announced");

        let mut last_contracts = 0;
        while ctx.tick().await {
            let Some(host) = ctx
                .retry("read host", |c| async move { c.host().await })
                .await
            else {
                return;
            };
            let contracts = host.financialmetrics.contractcount;
            if contracts != last_contracts {
                info!(contracts, "Host contract count changed");
                last_contracts = contracts;
            } else {
                debug!(
                    contracts,
                    accepting = host.externalsettings.acceptingcontracts,
                    "Host status"
                );
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
