//! The ant: one siad plus the jobs scripted against it
//!
//! An [`Ant`] is created from an [`AntConfig`]: siad is spawned and polled
//! until its API answers, a [`JobRunner`] bootstraps a wallet, and every
//! configured job is launched. [`Ant::close`] reverses this: jobs are drained
//! first, then siad is stopped.

use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::{BlockHeight, BlockId, Currency, SiadError};
use crate::config::{AntConfig, ConfigError};
use crate::jobs::BalanceMaintainer;
use crate::ledger::{LedgerError, SeenBlocks};
use crate::process::{SiadOptions, SiadProcess, SupervisorError};
use crate::runner::{JobRunner, RunnerError};

/// Errors returned by [`Ant`]
#[derive(Debug, Error)]
pub enum AntError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("siad error: {0}")]
    Supervisor(#[from] SupervisorError),

    #[error("Job runner error: {0}")]
    Runner(#[from] RunnerError),

    #[error("Client error: {0}")]
    Client(#[from] SiadError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// A siad node driven by scripted jobs
#[derive(Debug)]
pub struct Ant {
    api_addr: String,
    rpc_addr: String,
    siad: SiadProcess,
    runner: JobRunner,
    seen_blocks: SeenBlocks,
    shutdown_grace: Duration,
    closed: bool,
}

impl Ant {
    /// Start siad and launch the configured jobs
    ///
    /// If anything fails after siad was spawned, siad is stopped before the
    /// error is returned. An interrupt during construction stops siad; once
    /// the ant is returned, the caller handles interrupts by calling
    /// [`Ant::close`].
    pub async fn new(config: AntConfig) -> Result<Self, AntError> {
        config.validate()?;

        let mut siad = SiadProcess::start(&SiadOptions::from_config(&config)).await?;

        let runner = match start_jobs(&config).await {
            Ok(runner) => runner,
            Err(e) => {
                warn!(api_addr = %config.api_addr, error = %e, "Ant setup failed, stopping siad");
                if let Err(stop_err) = siad.shutdown(config.shutdown_grace).await {
                    warn!(error = %stop_err, "Failed to stop siad after setup error");
                }
                return Err(e);
            }
        };

        // Interrupts now go through `close`, which drains jobs first
        siad.disarm_interrupt();

        info!(
            api_addr = %config.api_addr,
            jobs = ?runner.active_jobs(),
            "Ant started"
        );

        Ok(Self {
            api_addr: config.api_addr,
            rpc_addr: config.rpc_addr,
            siad,
            runner,
            seen_blocks: SeenBlocks::new(),
            shutdown_grace: config.shutdown_grace,
            closed: false,
        })
    }

    pub fn api_addr(&self) -> &str {
        &self.api_addr
    }

    pub fn rpc_addr(&self) -> &str {
        &self.rpc_addr
    }

    /// OS process id of siad
    pub fn pid(&self) -> Option<u32> {
        self.siad.id()
    }

    pub fn runner(&self) -> &JobRunner {
        &self.runner
    }

    /// Handle to this ant's seen-blocks ledger
    pub fn seen_blocks(&self) -> &SeenBlocks {
        &self.seen_blocks
    }

    /// Highest block height this ant has recorded, or zero
    pub fn block_height(&self) -> BlockHeight {
        self.seen_blocks.max_height()
    }

    /// Record siad's current tip in the seen-blocks ledger
    ///
    /// Fails with [`LedgerError::Fork`] when siad reports a different block
    /// at an already recorded height.
    pub async fn sync_block(&self) -> Result<(BlockHeight, BlockId), AntError> {
        let consensus = self.runner.client().consensus().await?;
        let outcome = self
            .seen_blocks
            .record(consensus.height, consensus.currentblock.clone())?;
        debug!(height = consensus.height, ?outcome, "Recorded block");
        Ok((consensus.height, consensus.currentblock))
    }

    /// Wait for siad to exit on its own
    pub async fn wait(&mut self) -> Result<ExitStatus, AntError> {
        Ok(self.siad.wait().await?)
    }

    /// Stop all jobs, then stop siad
    ///
    /// Never fails because siad is already gone; calling it again is a no-op.
    pub async fn close(&mut self) -> Result<(), AntError> {
        if self.closed {
            return Ok(());
        }
        self.runner.stop().await;

        match self.siad.shutdown(self.shutdown_grace).await {
            Ok(status) => debug!(api_addr = %self.api_addr, %status, "siad stopped"),
            Err(e) => warn!(api_addr = %self.api_addr, error = %e, "Error while stopping siad"),
        }
        self.closed = true;
        info!(api_addr = %self.api_addr, "Ant closed");
        Ok(())
    }
}

/// Build the job runner and launch every configured job
async fn start_jobs(config: &AntConfig) -> Result<JobRunner, AntError> {
    let runner = JobRunner::new(
        &config.api_addr,
        config.api_password.as_deref(),
        &config.sia_directory,
    )
    .await?
    .with_settings(config.job_settings.clone());

    for name in &config.jobs {
        match runner.launch(name) {
            Ok(()) => {}
            Err(RunnerError::UnknownJob(job)) if !config.strict_jobs => {
                warn!(job = %job, "Unknown job, skipping");
            }
            Err(e) => {
                runner.stop().await;
                return Err(e.into());
            }
        }
    }

    if config.desired_currency != 0 {
        let desired = Currency::siacoins(config.desired_currency);
        runner.spawn_job(Arc::new(BalanceMaintainer::new(desired)))?;
    }

    Ok(runner)
}
