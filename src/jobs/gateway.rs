//! Gateway Job
//!
//! Watches the node's peer-to-peer connectivity.
//!
//! ## What it does
//!
//! 1. Periodically queries `GET /gateway`
//! 2. Logs the peer count, and an error whenever the peer list is empty
//!
//! The job never fails; an unreachable API is retried with backoff.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info};

use super::traits::{Job, JobContext, JobOptions};

/// Gateway connectability check
pub struct GatewayJob;

#[async_trait]
impl Job for GatewayJob {
    fn name(&self) -> &'static str {
        "gateway"
    }

    fn description(&self) -> &'static str {
        "Verify the gateway stays connected to peers"
    }

    async fn run(&self, ctx: JobContext) {
        let mut had_peers = None;

        loop {
            let Some(gateway) = ctx
                .retry("read gateway", |c| async move { c.gateway().await })
                .await
            else {
                return;
            };

            let peers = gateway.peers.len();
            if peers == 0 {
                error!(netaddress = %gateway.netaddress, "Gateway has no peers");
            } else if had_peers != Some(true) {
                info!(peers, netaddress = %gateway.netaddress, "Gateway is connected");
            } else {
                debug!(peers, "Gateway peers");
            }
            had_peers = Some(peers > 0);

            if !ctx.tick().await {
                return;
            }
        }
    }

    fn default_options(&self) -> JobOptions {
        JobOptions {
            interval: Duration::from_secs(30),
            ..JobOptions::default()
        }
    }
}
