//! siad API Client
//!
//! Hand-written client for the subset of the siad HTTP API that the ant
//! runtime and its jobs call.

mod siad;
mod types;

pub use siad::{SiadClient, SiadError, SiadResult};
pub use types::*;
