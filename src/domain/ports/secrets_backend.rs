use std::time::Duration;

use async_trait::async_trait;

use crate::domain::error::LeaseError;
use crate::domain::models::{Lease, RenewResponse};

/// Secrets backend port
///
/// The lease lifecycle manager depends only on these two operations. The
/// transport, authentication and address are the adapter's concern.
#[async_trait]
pub trait SecretsBackend: Send + Sync {
    /// Exchange a service/role pair for a freshly issued secret and its lease
    async fn issue(&self, service: &str, role: &str) -> Result<Lease, LeaseError>;

    /// Ask the backend to extend an existing lease
    ///
    /// `increment` is the requested extension; `None` leaves the choice to
    /// the backend.
    async fn renew(
        &self,
        lease_id: &str,
        increment: Option<Duration>,
    ) -> Result<RenewResponse, LeaseError>;
}
