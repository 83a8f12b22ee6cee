//! Leasekeeper - dynamic credential lease manager
//!
//! Leasekeeper fetches short-lived credentials from a Vault-like secrets
//! backend and keeps their lease alive by renewing it at two thirds of each
//! granted TTL, until the lease can no longer be extended or the caller stops.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Leases, renewal events, errors and the `SecretsBackend` port
//! - **Service Layer** (`services`): Credential fetching, lease watching and retry policy
//! - **Application Layer** (`application`): Fetch-and-watch sessions and the control loop
//! - **Infrastructure Layer** (`infrastructure`): Vault HTTP client, configuration, logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use leasekeeper::{Config, ControlLoop, CredentialSession, VaultClient, VaultClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let backend = Arc::new(VaultClient::new(VaultClientConfig::from_backend(&config.backend)?)?);
//!     let session = CredentialSession::new(backend, &config);
//!
//!     let mut watched = session.fetch_and_watch("billing", "ro").await?;
//!     let stopper = watched.handle.stop_handle();
//!     let outcome = ControlLoop::new(config.renewal.shutdown_grace())
//!         .run(&mut watched.events, &stopper, async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await;
//!     outcome.into_result()?;
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{ControlLoop, ControlOutcome, CredentialSession, WatchedCredential};
pub use domain::models::{
    Config, Lease, LeaseGrant, RenewResponse, RenewalEvent, RenewalState, SecretPayload,
};
pub use domain::ports::SecretsBackend;
pub use domain::{ExhaustionReason, LeaseError};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::vault::{VaultClient, VaultClientConfig};
pub use services::{
    CredentialFetcher, LeaseWatcher, RenewalEvents, RetryPolicy, StopHandle, WatcherConfig,
    WatcherHandle,
};
