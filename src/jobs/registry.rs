//! Job registry
//!
//! Central registry of the jobs an ant can be configured with by name.
//! New jobs should be registered here.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use std::sync::Arc;

use super::traits::Job;
use super::{GatewayJob, HostJob, MinerJob, RenterJob};

/// Global registry of all named jobs
///
/// The balance maintainer is absent on purpose: it is parameterized by the
/// desired currency and launched directly by the ant.
pub static JOBS: Lazy<IndexMap<&'static str, Arc<dyn Job>>> = Lazy::new(|| {
    let mut m: IndexMap<&'static str, Arc<dyn Job>> = IndexMap::new();

    m.insert("miner", Arc::new(MinerJob));
    m.insert("host", Arc::new(HostJob));
    m.insert("renter", Arc::new(RenterJob));
    m.insert("gateway", Arc::new(GatewayJob));

    m
});

/// Get a job by name
pub fn get_job(name: &str) -> Option<Arc<dyn Job>> {
    JOBS.get(name).cloned()
}

/// List all registered job names
pub fn list_jobs() -> Vec<&'static str> {
    let mut names: Vec<_> = JOBS.keys().copied().collect();
    names.sort();
    names
}
