//! sia-ant - A Sia node driven by scripted user stories
//!
//! An ant is one `siad` subprocess plus a set of background jobs that
//! exercise it (mining, hosting, renting, gateway probing, balance upkeep).
//! Many ants composed together form an antfarm: a network test harness that
//! compares each ant's view of the chain to verify consensus.
//!
//! ## Architecture
//!
//! - Configuration is loaded once and never mutated
//! - `siad` is spawned, then polled until its API answers
//! - A job runner bootstraps a wallet and launches jobs as tokio tasks that
//!   share one cancellation token
//! - Closing an ant drains every job before `siad` is stopped
//!
//! ## Modules
//!
//! - [`client`] - HTTP client for the siad API
//! - [`config`] - Ant configuration (YAML / JSON)
//! - [`process`] - siad subprocess supervision
//! - [`jobs`] - Job trait, registry and implementations
//! - [`runner`] - Job runner (launch, cancel, drain)
//! - [`ledger`] - Seen-blocks ledger with fork detection
//! - [`ant`] - The ant itself

pub mod ant;
pub mod client;
pub mod config;
pub mod jobs;
pub mod ledger;
pub mod process;
pub mod runner;
pub mod utils;

pub use ant::{Ant, AntError};
pub use config::AntConfig;
