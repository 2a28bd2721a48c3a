//! sia-ant Test Kit
//!
//! Test infrastructure for the ant runtime.
//!
//! This crate provides:
//! - [`mock::MockSiad`], an in-process HTTP server answering the siad
//!   endpoints the ant uses, with request counters and failure switches
//! - Seeded random generation of block ids, chains and wallet seeds for
//!   reproducible tests
//!
//! # Example
//!
//! ```rust
//! use sia_ant_testkit::random::PseudoGenerator;
//!
//! let mut rng = PseudoGenerator::new(12345);
//! let id = rng.random_block_id();
//! assert_eq!(id.len(), 64);
//! ```

pub mod mock;
pub mod random;

pub use mock::{MockSiad, MockState};
pub use random::PseudoGenerator;
