//! Infrastructure layer module
//!
//! This module contains all infrastructure adapters and external integrations:
//! - Vault HTTP client (the `SecretsBackend` adapter)
//! - Configuration management
//! - Logging infrastructure
//! - A scripted in-memory backend for tests
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod config;
pub mod logging;
pub mod mock_backend;
pub mod vault;
