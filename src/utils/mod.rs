//! Utility modules for sia-ant
//!
//! Common helpers shared by the process supervisor and the jobs.

pub mod backoff;

pub use backoff::{Backoff, sleep_or_cancel};
