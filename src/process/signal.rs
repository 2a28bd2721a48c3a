//! Stop requests and interrupt handling for siad
//!
//! Both the interrupt listener and normal teardown stop siad the same way:
//! ask the API first, and fall back to an OS interrupt when the API does not
//! answer (typically because it has not finished loading).

use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::SiadClient;

/// How a stop request reached siad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMethod {
    /// `GET /daemon/stop` succeeded
    Api,
    /// The API call failed and SIGINT was delivered instead
    Interrupt,
    /// Neither the API nor the signal reached a running process
    Unreachable,
}

/// Upper bound on a single `GET /daemon/stop`
pub(crate) const STOP_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Ask siad to stop, falling back to SIGINT
pub async fn request_stop(client: &SiadClient, pid: Option<u32>) -> StopMethod {
    let error = match tokio::time::timeout(STOP_REQUEST_TIMEOUT, client.daemon_stop()).await {
        Ok(Ok(())) => return StopMethod::Api,
        Ok(Err(e)) => e.to_string(),
        Err(_) => format!("no answer within {STOP_REQUEST_TIMEOUT:?}"),
    };

    let Some(pid) = pid else {
        debug!(error = %error, "daemon/stop failed and no pid is known");
        return StopMethod::Unreachable;
    };

    debug!(pid, error = %error, "daemon/stop failed, sending interrupt");
    match send_interrupt_signal(pid) {
        Ok(true) => StopMethod::Interrupt,
        Ok(false) => StopMethod::Unreachable,
        Err(e) => {
            warn!(pid, error = %e, "Failed to interrupt siad");
            StopMethod::Unreachable
        }
    }
}

/// Stop siad when this process receives an interrupt
///
/// On unix the handler is registered before this returns, so an interrupt
/// arriving right after spawn is not lost. The listener lives until the
/// owner aborts the returned handle.
pub fn spawn_interrupt_listener(client: SiadClient, pid: Option<u32>) -> JoinHandle<()> {
    let interrupt = register_interrupt();
    tokio::spawn(async move {
        match interrupt {
            Ok(interrupt) => interrupt.await,
            Err(e) => {
                warn!(error = %e, "Unable to listen for interrupts; siad may be orphaned");
                return;
            }
        }
        info!(pid = ?pid, "Interrupt received, stopping siad");
        let method = request_stop(&client, pid).await;
        debug!(?method, "Stop requested after interrupt");
    })
}

#[cfg(unix)]
fn register_interrupt() -> std::io::Result<impl Future<Output = ()> + Send + 'static> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt())?;
    Ok(async move {
        interrupt.recv().await;
    })
}

#[cfg(not(unix))]
fn register_interrupt() -> std::io::Result<impl Future<Output = ()> + Send + 'static> {
    // Registration happens on first poll here; an interrupt in that window
    // is missed.
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Unable to listen for interrupts; siad may be orphaned");
            std::future::pending::<()>().await;
        }
    })
}

/// Deliver SIGINT to `pid`
///
/// Returns `Ok(false)` if the process no longer exists.
#[cfg(unix)]
fn send_interrupt_signal(pid: u32) -> std::io::Result<bool> {
    let pid: libc::pid_t = pid.try_into().map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "pid out of range for SIGINT")
    })?;
    let res = unsafe { libc::kill(pid, libc::SIGINT) };
    if res == 0 {
        return Ok(true);
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        return Ok(false);
    }
    Err(err)
}

#[cfg(not(unix))]
fn send_interrupt_signal(_pid: u32) -> std::io::Result<bool> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "interrupt signals are only supported on unix",
    ))
}
