use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Backend address cannot be empty")]
    EmptyAddress,

    #[error("A Vault token is required (set VAULT_TOKEN or pass --token)")]
    MissingToken,

    #[error("Invalid secret path template: {0}. Must contain {{service}} and {{role}}")]
    InvalidSecretPathTemplate(String),

    #[error("Invalid request_timeout_secs: {0}. Must be at least 1")]
    InvalidRequestTimeout(u64),

    #[error("Invalid renewal_fraction: {0}. Must be between 0 and 1 (exclusive)")]
    InvalidRenewalFraction(f64),

    #[error("Invalid initial_backoff_ms: {0}. Must be at least 1")]
    InvalidInitialBackoff(u64),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must not exceed max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. leasekeeper.yaml (project config, optional)
    /// 3. leasekeeper.local.yaml (local overrides, optional)
    /// 4. Environment variables (LEASEKEEPER_* prefix, `__` for nesting)
    ///
    /// Command-line flags are applied on top by the CLI.
    pub fn load() -> Result<Config> {
        let config: Config = Self::base()
            .merge(Yaml::file("leasekeeper.yaml"))
            .merge(Yaml::file("leasekeeper.local.yaml"))
            .merge(Env::prefixed("LEASEKEEPER_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honouring the environment
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()).into());
        }

        let config: Config = Self::base()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("LEASEKEEPER_").split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn base() -> Figment {
        Figment::new().merge(Serialized::defaults(Config::default()))
    }

    /// Validate configuration after loading
    ///
    /// The token is checked separately by [`ConfigLoader::require_token`],
    /// since it usually arrives through the command line.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        // Validate backend config
        if config.backend.address.trim().is_empty() {
            return Err(ConfigError::EmptyAddress);
        }

        let template = &config.backend.secret_path_template;
        if !template.contains("{service}") || !template.contains("{role}") {
            return Err(ConfigError::InvalidSecretPathTemplate(template.clone()));
        }

        if config.backend.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidRequestTimeout(
                config.backend.request_timeout_secs,
            ));
        }

        // Validate renewal config
        let fraction = config.renewal.renewal_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(ConfigError::InvalidRenewalFraction(fraction));
        }

        if config.renewal.initial_backoff_ms == 0 {
            return Err(ConfigError::InvalidInitialBackoff(
                config.renewal.initial_backoff_ms,
            ));
        }

        if config.renewal.initial_backoff_ms > config.renewal.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.renewal.initial_backoff_ms,
                config.renewal.max_backoff_ms,
            ));
        }

        // Validate logging config
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }

    /// Ensure a non-empty token is configured
    pub fn require_token(config: &Config) -> Result<(), ConfigError> {
        match config.backend.token.as_deref() {
            Some(token) if !token.trim().is_empty() => Ok(()),
            _ => Err(ConfigError::MissingToken),
        }
    }
}
