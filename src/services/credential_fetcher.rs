use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::domain::models::Lease;
use crate::domain::ports::SecretsBackend;
use crate::domain::LeaseError;

/// One-shot exchange of a service/role pair for a freshly issued secret
///
/// The fetcher never retries: whether to try again after a failed fetch is
/// the caller's decision. Every call is bounded by `request_timeout`.
pub struct CredentialFetcher {
    backend: Arc<dyn SecretsBackend>,
    request_timeout: Duration,
}

impl CredentialFetcher {
    pub fn new(backend: Arc<dyn SecretsBackend>, request_timeout: Duration) -> Self {
        Self {
            backend,
            request_timeout,
        }
    }

    /// Issue a secret for `service`/`role`
    ///
    /// Both identifiers must already be validated as non-empty. A lease with
    /// a zero ttl is rejected as an invalid backend response.
    #[instrument(skip(self))]
    pub async fn fetch(&self, service: &str, role: &str) -> Result<Lease, LeaseError> {
        let lease = tokio::time::timeout(self.request_timeout, self.backend.issue(service, role))
            .await
            .map_err(|_| LeaseError::Timeout(self.request_timeout))?
            .inspect_err(|err| warn!(error = %err, "credential fetch failed"))?;

        if lease.ttl.is_zero() {
            return Err(LeaseError::InvalidResponse(format!(
                "lease {} was issued without a ttl",
                lease.lease_id
            )));
        }

        info!(
            lease_id = %lease.lease_id,
            ttl_secs = lease.ttl.as_secs(),
            renewable = lease.renewable,
            fields = lease.payload.len(),
            "fetched dynamic credentials"
        );

        Ok(lease)
    }
}
