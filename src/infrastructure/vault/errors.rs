use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use super::types::ErrorResponse;
use crate::domain::LeaseError;

/// Errors that can occur when talking to the Vault HTTP API
#[derive(Error, Debug)]
pub enum VaultApiError {
    /// Malformed request or a lease-level rejection (HTTP 400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing, invalid or expired token (HTTP 401, 403)
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Path or lease not found (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limit exceeded - too many requests")]
    RateLimitExceeded,

    /// Server error or sealed/standby node (HTTP 5xx)
    #[error("Server error ({0}): {1}")]
    ServerError(StatusCode, String),

    /// Network or connection error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Request exceeded the configured timeout
    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    /// Unknown or unexpected status
    #[error("Unknown error ({0}): {1}")]
    UnknownError(StatusCode, String),
}

impl VaultApiError {
    /// Classify a non-success HTTP status
    ///
    /// Vault reports failures as `{"errors": ["..."]}`; the joined messages
    /// become the error text, falling back to the raw body.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorResponse>(body)
            .ok()
            .filter(|parsed| !parsed.errors.is_empty())
            .map_or_else(|| body.trim().to_string(), |parsed| parsed.errors.join("; "));

        match status.as_u16() {
            400 => Self::BadRequest(message),
            401 | 403 => Self::PermissionDenied(message),
            404 => Self::NotFound(message),
            429 => Self::RateLimitExceeded,
            500..=599 => Self::ServerError(status, message),
            _ => Self::UnknownError(status, message),
        }
    }
}

impl From<VaultApiError> for LeaseError {
    fn from(err: VaultApiError) -> Self {
        match err {
            VaultApiError::PermissionDenied(msg) => Self::AuthenticationFailed(msg),
            VaultApiError::NotFound(msg) => Self::NotFound(msg),
            VaultApiError::Timeout(after) => Self::Timeout(after),
            VaultApiError::RateLimitExceeded
            | VaultApiError::ServerError(_, _)
            | VaultApiError::NetworkError(_) => Self::BackendUnavailable(err.to_string()),
            VaultApiError::BadRequest(_)
            | VaultApiError::JsonError(_)
            | VaultApiError::UnknownError(_, _) => Self::InvalidResponse(err.to_string()),
        }
    }
}
