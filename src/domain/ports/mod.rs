//! Port trait definitions (Hexagonal Architecture)
//!
//! - `SecretsBackend`: issue and renew leases on the secrets backend
//!
//! Infrastructure adapters implement these traits so the lease lifecycle
//! manager stays independent of any particular backend protocol.

pub mod secrets_backend;

pub use secrets_backend::SecretsBackend;
