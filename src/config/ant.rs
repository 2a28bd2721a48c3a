//! Ant configuration types
//!
//! Defines the structure of ant configuration files.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::jobs::JobOptions;

/// Errors that can occur during configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Per-job overrides of a job's default pacing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobConfig {
    /// Delay between iterations of the job's main loop
    #[serde(
        default,
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub interval: Option<Duration>,

    /// First delay after a failed API call
    #[serde(
        default,
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub retry_delay: Option<Duration>,

    /// Upper bound on the failure backoff
    #[serde(
        default,
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_backoff: Option<Duration>,
}

impl JobConfig {
    /// Convert to JobOptions, falling back to the job's defaults
    pub fn to_job_options(&self, defaults: &JobOptions) -> JobOptions {
        JobOptions {
            interval: self.interval.unwrap_or(defaults.interval),
            retry_delay: self.retry_delay.unwrap_or(defaults.retry_delay),
            max_backoff: self.max_backoff.unwrap_or(defaults.max_backoff),
        }
    }
}

/// Configuration of a single ant
///
/// Constructed once by the caller and never mutated by the ant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AntConfig {
    /// siad `--api-addr`
    #[serde(default = "default_api_addr")]
    pub api_addr: String,

    /// siad `--rpc-addr`
    #[serde(default = "default_rpc_addr")]
    pub rpc_addr: String,

    /// siad `--host-addr`
    #[serde(default = "default_host_addr")]
    pub host_addr: String,

    /// siad `--sia-directory`
    #[serde(default = "default_sia_directory")]
    pub sia_directory: String,

    /// Path to the siad executable
    #[serde(default = "default_siad_path")]
    pub siad_path: String,

    /// Jobs to launch, by name
    #[serde(default)]
    pub jobs: Vec<String>,

    /// Siacoin balance to maintain by toggling the miner; 0 disables
    #[serde(default)]
    pub desired_currency: u64,

    /// API password, if siad requires one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_password: Option<String>,

    /// How long to wait for the API to answer after spawning siad
    #[serde(default = "default_readiness_timeout", with = "humantime_serde")]
    pub readiness_timeout: Duration,

    /// Delay between readiness checks
    #[serde(default = "default_readiness_interval", with = "humantime_serde")]
    pub readiness_interval: Duration,

    /// How long to wait for siad to exit after a stop request before killing it
    #[serde(default = "default_shutdown_grace", with = "humantime_serde")]
    pub shutdown_grace: Duration,

    /// Treat unknown job names as a construction error instead of skipping them
    #[serde(default)]
    pub strict_jobs: bool,

    /// Per-job pacing overrides (job_name -> config)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub job_settings: HashMap<String, JobConfig>,
}

fn default_api_addr() -> String {
    "localhost:9980".to_string()
}

fn default_rpc_addr() -> String {
    ":9981".to_string()
}

fn default_host_addr() -> String {
    ":9982".to_string()
}

fn default_sia_directory() -> String {
    "./".to_string()
}

fn default_siad_path() -> String {
    "siad".to_string()
}

fn default_readiness_timeout() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_readiness_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_shutdown_grace() -> Duration {
    Duration::from_secs(10)
}

impl Default for AntConfig {
    fn default() -> Self {
        Self {
            api_addr: default_api_addr(),
            rpc_addr: default_rpc_addr(),
            host_addr: default_host_addr(),
            sia_directory: default_sia_directory(),
            siad_path: default_siad_path(),
            jobs: Vec::new(),
            desired_currency: 0,
            api_password: None,
            readiness_timeout: default_readiness_timeout(),
            readiness_interval: default_readiness_interval(),
            shutdown_grace: default_shutdown_grace(),
            strict_jobs: false,
            job_settings: HashMap::new(),
        }
    }
}

impl AntConfig {
    /// Load configuration from a file
    ///
    /// Files ending in `.json` are parsed as JSON, everything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json(&content)?
        } else {
            Self::from_yaml(&content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reject configurations siad could never start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("apiAddr", &self.api_addr),
            ("rpcAddr", &self.rpc_addr),
            ("hostAddr", &self.host_addr),
            ("siaDirectory", &self.sia_directory),
            ("siadPath", &self.siad_path),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{field} must not be empty")));
            }
        }
        if self.readiness_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "readinessInterval must be greater than zero".to_string(),
            ));
        }
        for (name, job) in &self.job_settings {
            let durations = [("interval", job.interval), ("retryDelay", job.retry_delay)];
            for (field, value) in durations {
                if value.is_some_and(|d| d.is_zero()) {
                    return Err(ConfigError::Invalid(format!(
                        "jobSettings.{name}.{field} must be greater than zero"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Serialize to YAML string
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}
