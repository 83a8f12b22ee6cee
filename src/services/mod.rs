//! Service layer
//!
//! - `CredentialFetcher`: one-shot secret issuance
//! - `LeaseWatcher`: scheduled renewal of an issued lease on its own task
//! - `RetryPolicy`: bounded backoff for transient renewal failures

pub mod credential_fetcher;
pub mod lease_watcher;
pub mod retry;

pub use credential_fetcher::CredentialFetcher;
pub use lease_watcher::{
    LeaseWatcher, RenewalEvents, StopHandle, WatcherConfig, WatcherHandle,
};
pub use retry::RetryPolicy;
