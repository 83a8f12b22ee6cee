//! Vault HTTP API request and response bodies

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Response to a secret read or a lease renewal
#[derive(Debug, Clone, Deserialize)]
pub struct SecretResponse {
    #[serde(default)]
    pub lease_id: String,

    #[serde(default)]
    pub renewable: bool,

    /// Lease ttl in seconds
    #[serde(default)]
    pub lease_duration: u64,

    #[serde(default)]
    pub data: Option<BTreeMap<String, serde_json::Value>>,
}

/// Body of `PUT /v1/sys/leases/renew`
#[derive(Debug, Clone, Serialize)]
pub struct RenewRequest<'a> {
    pub lease_id: &'a str,

    /// Requested extension in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub increment: Option<u64>,
}

/// Error body returned by Vault on non-success statuses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub errors: Vec<String>,
}
