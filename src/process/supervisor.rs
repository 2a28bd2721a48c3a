//! siad subprocess supervision
//!
//! [`SiadProcess`] owns a running siad. The child is spawned with
//! kill-on-drop, so whichever way the owner goes away (error, panic, plain
//! drop) the daemon goes with it. Graceful teardown goes through
//! [`SiadProcess::shutdown`].

use std::process::ExitStatus;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::signal::{STOP_REQUEST_TIMEOUT, StopMethod, request_stop, spawn_interrupt_listener};
use crate::client::{SiadClient, SiadError};
use crate::config::AntConfig;

/// Errors raised while supervising siad
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Failed to start siad at '{path}': {source}")]
    SpawnFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timeout: couldn't reach siad API after {0:?}")]
    ApiTimeout(Duration),

    #[error("Client error: {0}")]
    Client(#[from] SiadError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything needed to launch siad and wait for it
#[derive(Debug, Clone)]
pub struct SiadOptions {
    pub siad_path: String,
    pub sia_directory: String,
    pub api_addr: String,
    pub rpc_addr: String,
    pub host_addr: String,
    pub api_password: Option<String>,
    /// Absolute bound on waiting for the API after spawn
    pub readiness_timeout: Duration,
    /// Delay between liveness checks
    pub readiness_interval: Duration,
}

impl SiadOptions {
    pub fn from_config(config: &AntConfig) -> Self {
        Self {
            siad_path: config.siad_path.clone(),
            sia_directory: config.sia_directory.clone(),
            api_addr: config.api_addr.clone(),
            rpc_addr: config.rpc_addr.clone(),
            host_addr: config.host_addr.clone(),
            api_password: config.api_password.clone(),
            readiness_timeout: config.readiness_timeout,
            readiness_interval: config.readiness_interval,
        }
    }

    /// Command line siad is started with
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.siad_path);
        cmd.arg("--no-bootstrap")
            .arg("--sia-directory")
            .arg(&self.sia_directory)
            .arg("--api-addr")
            .arg(&self.api_addr)
            .arg("--rpc-addr")
            .arg(&self.rpc_addr)
            .arg("--host-addr")
            .arg(&self.host_addr)
            .kill_on_drop(true);
        cmd
    }
}

/// A running siad subprocess
#[derive(Debug)]
pub struct SiadProcess {
    child: Child,
    pid: Option<u32>,
    client: SiadClient,
    interrupt_listener: JoinHandle<()>,
    exit_status: Option<ExitStatus>,
}

impl SiadProcess {
    /// Spawn siad and block until its API answers
    ///
    /// On timeout siad is asked to stop, then killed; no process is left
    /// running when an error is returned.
    pub async fn start(opts: &SiadOptions) -> Result<Self, SupervisorError> {
        let mut process = Self::spawn(opts)?;

        if let Err(e) =
            wait_for_api(&process.client, opts.readiness_interval, opts.readiness_timeout).await
        {
            warn!(api_addr = %opts.api_addr, error = %e, "siad API never came up");
            match tokio::time::timeout(STOP_REQUEST_TIMEOUT, process.client.daemon_stop()).await {
                Ok(Ok(())) => {}
                Ok(Err(stop_err)) => debug!(error = %stop_err, "Best-effort daemon/stop failed"),
                Err(_) => debug!("Best-effort daemon/stop timed out"),
            }
            process.kill().await;
            return Err(e);
        }

        info!(pid = ?process.pid, api_addr = %opts.api_addr, "siad is ready");
        Ok(process)
    }

    /// Spawn siad without waiting for its API
    ///
    /// The interrupt listener is installed immediately so an interrupted
    /// supervisor never leaves siad orphaned.
    pub fn spawn(opts: &SiadOptions) -> Result<Self, SupervisorError> {
        let client = SiadClient::new(&opts.api_addr, opts.api_password.as_deref())?;

        let child = opts
            .command()
            .spawn()
            .map_err(|source| SupervisorError::SpawnFailed {
                path: opts.siad_path.clone(),
                source,
            })?;
        let pid = child.id();
        debug!(pid = ?pid, siad = %opts.siad_path, "Spawned siad");

        let interrupt_listener = spawn_interrupt_listener(client.clone(), pid);

        Ok(Self {
            child,
            pid,
            client,
            interrupt_listener,
            exit_status: None,
        })
    }

    /// OS process id, if siad was still running when spawned
    pub fn id(&self) -> Option<u32> {
        self.pid
    }

    /// Client bound to this siad's API
    pub fn client(&self) -> &SiadClient {
        &self.client
    }

    /// Stop reacting to interrupts
    ///
    /// From here on an interrupt is the owner's to handle, and the owner
    /// must drain its jobs before stopping siad.
    pub fn disarm_interrupt(&mut self) {
        self.interrupt_listener.abort();
    }

    /// Exit status if siad has already exited
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>, SupervisorError> {
        if self.exit_status.is_none() {
            self.exit_status = self.child.try_wait()?;
        }
        Ok(self.exit_status)
    }

    /// Wait for siad to exit
    pub async fn wait(&mut self) -> Result<ExitStatus, SupervisorError> {
        if let Some(status) = self.exit_status {
            return Ok(status);
        }
        let status = self.child.wait().await?;
        self.exit_status = Some(status);
        Ok(status)
    }

    /// Request a graceful stop without waiting for exit
    ///
    /// Safe to call repeatedly; once siad has exited this is a no-op.
    pub async fn stop(&mut self) -> Result<StopMethod, SupervisorError> {
        if self.try_wait()?.is_some() {
            return Ok(StopMethod::Unreachable);
        }
        Ok(request_stop(&self.client, self.pid).await)
    }

    /// Stop siad, waiting up to `grace` before killing it
    pub async fn shutdown(&mut self, grace: Duration) -> Result<ExitStatus, SupervisorError> {
        let method = self.stop().await?;
        debug!(pid = ?self.pid, ?method, "Waiting for siad to exit");

        let status = match tokio::time::timeout(grace, self.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                warn!(pid = ?self.pid, grace_secs = grace.as_secs(), "siad ignored stop request, killing");
                self.kill().await;
                self.wait().await?
            }
        };

        self.interrupt_listener.abort();
        info!(pid = ?self.pid, %status, "siad exited");
        Ok(status)
    }

    /// Kill siad and reap it
    async fn kill(&mut self) {
        if self.exit_status.is_some() {
            return;
        }
        match self.child.kill().await {
            Ok(()) => {
                self.exit_status = self.child.try_wait().ok().flatten();
            }
            Err(e) => warn!(pid = ?self.pid, error = %e, "Failed to kill siad"),
        }
        self.interrupt_listener.abort();
    }
}

impl Drop for SiadProcess {
    fn drop(&mut self) {
        self.interrupt_listener.abort();
    }
}

/// Poll the liveness endpoint until it answers or `timeout` elapses
pub async fn wait_for_api(
    client: &SiadClient,
    interval: Duration,
    timeout: Duration,
) -> Result<(), SupervisorError> {
    let start = Instant::now();
    loop {
        // A single request may not outlive the overall bound
        let remaining = timeout.saturating_sub(start.elapsed());
        match tokio::time::timeout(remaining, client.consensus()).await {
            Ok(Ok(_)) => {
                debug!(elapsed_ms = start.elapsed().as_millis(), "siad API is up");
                return Ok(());
            }
            Ok(Err(e)) => debug!(error = %e, "siad API not ready yet"),
            Err(_) => debug!("siad API request timed out"),
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Err(SupervisorError::ApiTimeout(timeout));
        }
        tokio::time::sleep(interval.min(timeout - elapsed)).await;
    }
}
