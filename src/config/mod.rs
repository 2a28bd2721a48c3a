//! Configuration parsing
//!
//! Handles parsing of ant configuration files.
//!
//! ## Configuration Format
//!
//! ```yaml
//! apiAddr: localhost:9980
//! rpcAddr: :9981
//! hostAddr: :9982
//! siaDirectory: ./ant-0
//! siadPath: siad
//! jobs:
//!   - gateway
//!   - miner
//! desiredCurrency: 1000
//! readinessTimeout: 5m
//!
//! jobSettings:
//!   gateway:
//!     interval: 30s
//!     retryDelay: 1s
//! ```
//!
//! The same keys are accepted in JSON for files ending in `.json`.

mod ant;

pub use ant::{AntConfig, ConfigError, JobConfig};
