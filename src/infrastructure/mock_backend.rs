//! Scripted secrets backend for testing

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::domain::models::{Lease, LeaseGrant, RenewResponse};
use crate::domain::ports::SecretsBackend;
use crate::domain::{ExhaustionReason, LeaseError};

/// One scripted answer to a renewal request
#[derive(Debug, Clone)]
pub enum RenewStep {
    /// Answer immediately
    Respond(Result<RenewResponse, LeaseError>),
    /// Answer after a delay
    Delayed(Duration, Result<RenewResponse, LeaseError>),
    /// Never answer
    Hang,
}

impl RenewStep {
    pub const fn extended(ttl: Duration) -> Self {
        Self::Respond(Ok(RenewResponse::Extended(LeaseGrant {
            ttl,
            renewable: true,
        })))
    }

    pub const fn terminal(reason: ExhaustionReason) -> Self {
        Self::Respond(Ok(RenewResponse::Terminal(reason)))
    }

    pub fn unavailable() -> Self {
        Self::Respond(Err(LeaseError::BackendUnavailable(
            "connection refused".to_string(),
        )))
    }
}

/// A renewal request observed by the mock
#[derive(Debug, Clone)]
pub struct RenewCall {
    pub lease_id: String,
    pub increment: Option<Duration>,
    pub at: Instant,
}

/// In-memory `SecretsBackend` answering from a script
///
/// Issue returns the configured lease (or error), or never answers once
/// `hang_on_issue` was called. Renewals consume the script in order; once it
/// runs out every renewal reports the lease as gone.
pub struct MockSecretsBackend {
    issued: Result<Lease, LeaseError>,
    issue_hangs: bool,
    script: Mutex<VecDeque<RenewStep>>,
    renew_calls: Mutex<Vec<RenewCall>>,
    issue_calls: Mutex<Vec<(String, String)>>,
}

impl MockSecretsBackend {
    pub fn new(issued: Result<Lease, LeaseError>) -> Self {
        Self {
            issued,
            issue_hangs: false,
            script: Mutex::new(VecDeque::new()),
            renew_calls: Mutex::new(Vec::new()),
            issue_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_lease(lease: Lease) -> Self {
        Self::new(Ok(lease))
    }

    /// Make every issue call hang
    #[must_use]
    pub fn hang_on_issue(mut self) -> Self {
        self.issue_hangs = true;
        self
    }

    /// Append scripted renewal answers
    #[must_use]
    pub fn then(self, steps: impl IntoIterator<Item = RenewStep>) -> Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(steps);
        self
    }

    pub fn renew_calls(&self) -> Vec<RenewCall> {
        self.renew_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn issue_calls(&self) -> Vec<(String, String)> {
        self.issue_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl SecretsBackend for MockSecretsBackend {
    async fn issue(&self, service: &str, role: &str) -> Result<Lease, LeaseError> {
        self.issue_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((service.to_string(), role.to_string()));
        if self.issue_hangs {
            std::future::pending::<()>().await;
        }
        self.issued.clone()
    }

    async fn renew(
        &self,
        lease_id: &str,
        increment: Option<Duration>,
    ) -> Result<RenewResponse, LeaseError> {
        self.renew_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RenewCall {
                lease_id: lease_id.to_string(),
                increment,
                at: Instant::now(),
            });

        let step = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| RenewStep::terminal(ExhaustionReason::LeaseNotFound));

        match step {
            RenewStep::Respond(result) => result,
            RenewStep::Delayed(delay, result) => {
                tokio::time::sleep(delay).await;
                result
            }
            RenewStep::Hang => std::future::pending().await,
        }
    }
}
