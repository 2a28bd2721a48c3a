//! siad process supervision
//!
//! Spawns siad with bootstrapping disabled, waits for its API to answer, and
//! tears it down again.
//!
//! ## Lifecycle
//!
//! 1. [`SiadProcess::spawn`] starts the binary and immediately installs an
//!    interrupt listener, so a Ctrl-C during setup still stops siad.
//! 2. [`SiadProcess::start`] additionally polls `GET /consensus` until it
//!    answers (default bound: 5 minutes).
//! 3. [`SiadProcess::shutdown`] sends `GET /daemon/stop` (falling back to
//!    SIGINT), waits a grace period, then kills.

mod signal;
mod supervisor;

pub use signal::{StopMethod, request_stop};
pub use supervisor::{SiadOptions, SiadProcess, SupervisorError, wait_for_api};
