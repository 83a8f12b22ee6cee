//! Domain layer for the lease lifecycle manager
//!
//! This module contains the lease model, renewal states and events, the
//! error taxonomy, and the port the secrets backend must satisfy.

pub mod error;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use error::{ExhaustionReason, LeaseError};
