//! Scripted ant behaviors
//!
//! This module provides the `Job` trait and the jobs an ant can run against
//! its siad.
//!
//! ## Jobs
//!
//! - **miner**: CPU-mine and verify block rewards arrive
//! - **host**: announce as a storage host
//! - **renter**: form and maintain storage contracts
//! - **gateway**: verify peer connectivity
//! - **balance** (not registered): toggle mining to hold a target balance
//!
//! ## Adding New Jobs
//!
//! 1. Create a new file in `src/jobs/` (e.g., `myjob.rs`)
//! 2. Implement the `Job` trait
//! 3. Register in `registry.rs`
//! 4. Add to `mod.rs` exports

mod balance;
mod gateway;
mod host;
mod miner;
pub mod registry;
mod renter;
mod traits;

pub use balance::BalanceMaintainer;
pub use gateway::GatewayJob;
pub use host::HostJob;
pub use miner::MinerJob;
pub use registry::JOBS;
pub use renter::RenterJob;
pub use traits::*;
