use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a lease reached the end of its life
///
/// Exhaustion is not a failure: the validity window of the secret has simply
/// ended and the caller must fetch a new one if it wants to continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionReason {
    /// The lease class, or the latest renew response, does not allow renewal
    NotRenewable,
    /// The backend no longer knows the lease
    LeaseNotFound,
    /// The absolute expiry passed before a renewal succeeded
    Expired,
    /// The backend granted no further validity
    ZeroTtl,
    /// Renewals stopped extending the lease; it is capped at its maximum ttl
    MaxTtlReached,
}

impl fmt::Display for ExhaustionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NotRenewable => "lease is not renewable",
            Self::LeaseNotFound => "lease no longer exists",
            Self::Expired => "lease expired before it could be renewed",
            Self::ZeroTtl => "backend granted no further validity",
            Self::MaxTtlReached => "lease reached its maximum ttl",
        };
        f.write_str(text)
    }
}

/// Errors produced by the lease lifecycle manager
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LeaseError {
    /// Bad inputs, rejected before any network activity
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network or transport failure, or the backend is temporarily unable to serve
    #[error("Secrets backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A backend call exceeded its time bound
    #[error("Secrets backend did not answer within {0:?}")]
    Timeout(Duration),

    /// The credential used to authenticate to the backend is invalid or expired
    #[error("Authentication to secrets backend failed: {0}")]
    AuthenticationFailed(String),

    /// No such service/role combination
    #[error("Secret not found: {0}")]
    NotFound(String),

    /// The backend replied with something we cannot interpret
    #[error("Invalid response from secrets backend: {0}")]
    InvalidResponse(String),

    /// Expected end-of-life of a lease
    #[error("Lease exhausted: {0}")]
    LeaseExhausted(ExhaustionReason),

    /// Caller-driven clean stop
    #[error("Cancellation requested")]
    CancellationRequested,

    /// The event stream ended without a terminal event
    #[error("Lease watcher stopped without reporting a final state")]
    WatcherGone,
}

impl LeaseError {
    /// Returns true if a renewal that failed with this error may be retried
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::BackendUnavailable(_) | Self::Timeout(_))
    }
}
