pub mod config;
pub mod lease;
pub mod renewal;

pub use config::{BackendConfig, Config, LoggingConfig, RenewalConfig};
pub use lease::{Lease, LeaseGrant, RenewResponse, SecretPayload};
pub use renewal::{RenewalEvent, RenewalState};
