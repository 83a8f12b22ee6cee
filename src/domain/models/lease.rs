use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::ExhaustionReason;

/// Opaque key/value data issued alongside a lease (e.g. username/password)
///
/// The lifecycle manager only carries this value around. `Debug` is redacted
/// so credentials never end up in logs.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretPayload(BTreeMap<String, serde_json::Value>);

impl SecretPayload {
    pub const fn new(data: BTreeMap<String, serde_json::Value>) -> Self {
        Self(data)
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Debug for SecretPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.keys().map(|k| (k, "[REDACTED]")))
            .finish()
    }
}

impl<K: Into<String>, V: Into<serde_json::Value>> FromIterator<(K, V)> for SecretPayload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// One issued credential and its validity window
#[derive(Debug, Clone, PartialEq)]
pub struct Lease {
    /// Backend-assigned identifier, unique per issuance
    pub lease_id: String,

    /// Validity remaining when the lease was last issued or renewed
    pub ttl: Duration,

    /// Whether the backend allows this lease to be renewed at all
    pub renewable: bool,

    /// Credential material, never inspected
    pub payload: SecretPayload,

    /// Wall-clock time of issuance
    pub issued_at: DateTime<Utc>,
}

impl Lease {
    pub fn new(
        lease_id: impl Into<String>,
        ttl: Duration,
        renewable: bool,
        payload: SecretPayload,
    ) -> Self {
        Self {
            lease_id: lease_id.into(),
            ttl,
            renewable,
            payload,
            issued_at: Utc::now(),
        }
    }
}

/// Validity granted by a successful renewal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseGrant {
    pub ttl: Duration,
    pub renewable: bool,
}

/// Non-error answers the backend can give to a renewal request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewResponse {
    /// The lease was extended
    Extended(LeaseGrant),
    /// The lease cannot be extended any further
    Terminal(ExhaustionReason),
}
