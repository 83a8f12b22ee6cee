use std::sync::Arc;
use std::time::Duration;

use crate::domain::models::{Config, Lease};
use crate::domain::ports::SecretsBackend;
use crate::domain::LeaseError;
use crate::services::{CredentialFetcher, LeaseWatcher, RenewalEvents, WatcherConfig, WatcherHandle};

/// An issued credential whose lease is being kept alive
pub struct WatchedCredential {
    /// The lease as issued; the watcher works on its own copy
    pub lease: Lease,
    pub events: RenewalEvents,
    pub handle: WatcherHandle,
}

impl WatchedCredential {
    pub fn stop(&self) {
        self.handle.stop();
    }
}

/// Caller-facing entry point: fetch a secret and watch its lease
pub struct CredentialSession {
    fetcher: CredentialFetcher,
    watcher: LeaseWatcher,
}

impl CredentialSession {
    pub fn new(backend: Arc<dyn SecretsBackend>, config: &Config) -> Self {
        Self::with_settings(
            backend,
            config.backend.request_timeout(),
            WatcherConfig::from_config(config),
        )
    }

    pub fn with_settings(
        backend: Arc<dyn SecretsBackend>,
        request_timeout: Duration,
        watcher_config: WatcherConfig,
    ) -> Self {
        Self {
            fetcher: CredentialFetcher::new(Arc::clone(&backend), request_timeout),
            watcher: LeaseWatcher::new(backend, watcher_config),
        }
    }

    /// Issue a secret without watching it
    pub async fn fetch(&self, service: &str, role: &str) -> Result<Lease, LeaseError> {
        validate_identifier("service", service)?;
        validate_identifier("role", role)?;
        self.fetcher.fetch(service, role).await
    }

    /// Issue a secret and start renewing its lease
    ///
    /// Fetch errors are returned as-is, without retry.
    pub async fn fetch_and_watch(
        &self,
        service: &str,
        role: &str,
    ) -> Result<WatchedCredential, LeaseError> {
        let lease = self.fetch(service, role).await?;
        let (events, handle) = self.watcher.start(lease.clone());

        Ok(WatchedCredential {
            lease,
            events,
            handle,
        })
    }
}

fn validate_identifier(name: &str, value: &str) -> Result<(), LeaseError> {
    if value.trim().is_empty() {
        return Err(LeaseError::Configuration(format!("{name} is required")));
    }
    if value.contains('/') {
        return Err(LeaseError::Configuration(format!(
            "{name} must not contain '/': {value}"
        )));
    }
    Ok(())
}
