use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Main configuration structure for Leasekeeper
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Secrets backend connection
    #[serde(default)]
    pub backend: BackendConfig,

    /// Lease renewal scheduling and retry policy
    #[serde(default)]
    pub renewal: RenewalConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Secrets backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BackendConfig {
    /// Base address of the Vault server
    #[serde(default = "default_address")]
    pub address: String,

    /// Token used to authenticate to Vault
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    /// Path of the dynamic secret, with `{service}` and `{role}` placeholders
    #[serde(default = "default_secret_path_template")]
    pub secret_path_template: String,

    /// Upper bound for every backend call, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_address() -> String {
    "http://127.0.0.1:8200".to_string()
}

fn default_secret_path_template() -> String {
    "{service}/database/postgres/creds/{role}_role".to_string()
}

const fn default_request_timeout_secs() -> u64 {
    30
}

impl BackendConfig {
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            token: None,
            secret_path_template: default_secret_path_template(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Lease renewal configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RenewalConfig {
    /// Fraction of the lease ttl to wait before renewing (0 < f < 1)
    #[serde(default = "default_renewal_fraction")]
    pub renewal_fraction: f64,

    /// Retries allowed for transient renewal failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff duration in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff duration in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Extension requested with each renewal, in seconds
    #[serde(default)]
    pub increment_secs: Option<u64>,

    /// How long to wait for the watcher to acknowledge a stop, in milliseconds
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

const fn default_renewal_fraction() -> f64 {
    2.0 / 3.0
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    1_000
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

const fn default_shutdown_grace_ms() -> u64 {
    5_000
}

impl RenewalConfig {
    pub fn increment(&self) -> Option<Duration> {
        self.increment_secs.map(Duration::from_secs)
    }

    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for RenewalConfig {
    fn default() -> Self {
        Self {
            renewal_fraction: default_renewal_fraction(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            increment_secs: None,
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for daily-rolling JSON log files (stderr only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}
