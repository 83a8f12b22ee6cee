//! CLI command implementations.

pub mod fetch;
pub mod watch;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::cli::types::SecretArgs;
use crate::domain::models::Config;
use crate::domain::ports::SecretsBackend;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::vault::{VaultClient, VaultClientConfig};

/// Load configuration and overlay command-line connection flags
///
/// Precedence: defaults, config file(s), `LEASEKEEPER_*` environment, flags.
pub fn load_config(path: Option<&Path>, secret: &SecretArgs) -> Result<Config> {
    let mut config = match path {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };

    secret.apply(&mut config);
    ConfigLoader::validate(&config)?;
    ConfigLoader::require_token(&config)?;

    Ok(config)
}

/// Build the Vault-backed secrets backend from configuration
pub fn connect(config: &Config) -> Result<Arc<dyn SecretsBackend>> {
    let client = VaultClient::new(VaultClientConfig::from_backend(&config.backend)?)?;
    Ok(Arc::new(client))
}
