//! Vault HTTP API adapter
//!
//! Implements the `SecretsBackend` port against Vault's dynamic secrets and
//! lease renewal endpoints.

pub mod client;
pub mod errors;
pub mod types;

pub use client::{VaultClient, VaultClientConfig};
pub use errors::VaultApiError;
