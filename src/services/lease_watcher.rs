//! Lease renewal watcher
//!
//! Runs one tokio task per watched lease. The task sleeps until a fraction of
//! the lease ttl has elapsed, renews it, and reports each outcome on an
//! ordered event stream:
//!
//! ```text
//! Active --(deadline, renew ok)------------------------> Active    [Renewed]
//! Active --(not renewable / past expiry / lease gone)--> Exhausted [Exhausted]
//! Active --(transient failure, retries remain)---------> Active    (retry)
//! Active --(permanent failure / retries spent)---------> Failed    [Failed]
//! Active --(stop)--------------------------------------> Stopped   [Stopped]
//! ```
//!
//! Exactly one terminal event is ever emitted. `stop()` emits `Stopped` itself
//! and closes the stream before returning, so a renewal finishing after the
//! stop is discarded.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::Stream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, timeout, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::retry::RetryPolicy;
use crate::domain::models::{Config, Lease, LeaseGrant, RenewResponse, RenewalEvent, RenewalState};
use crate::domain::ports::SecretsBackend;
use crate::domain::{ExhaustionReason, LeaseError};

/// Scheduling and retry settings for the watcher
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatcherConfig {
    /// Fraction of the ttl to wait before renewing, in (0, 1)
    pub renewal_fraction: f64,

    /// Extension requested with each renewal
    pub increment: Option<Duration>,

    /// Upper bound for a single renewal call
    pub request_timeout: Duration,

    /// Retry bound and backoff curve for transient failures
    pub retry: RetryPolicy,
}

impl WatcherConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            renewal_fraction: config.renewal.renewal_fraction,
            increment: config.renewal.increment(),
            request_timeout: config.backend.request_timeout(),
            retry: RetryPolicy::from_config(&config.renewal),
        }
    }

    /// Time to wait after a grant of `ttl` before renewing
    pub fn renewal_delay(&self, ttl: Duration) -> Duration {
        ttl.mul_f64(self.renewal_fraction)
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// State shared between the watcher task and its handles
struct Shared {
    /// `None` once a terminal event has been sent
    events: Mutex<Option<mpsc::UnboundedSender<RenewalEvent>>>,
    state: watch::Sender<RenewalState>,
    cancel: watch::Sender<bool>,
}

impl Shared {
    fn sender(&self) -> std::sync::MutexGuard<'_, Option<mpsc::UnboundedSender<RenewalEvent>>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a non-terminal state unless the watch already ended
    fn set_state(&self, state: RenewalState) {
        let guard = self.sender();
        if guard.is_some() {
            self.state.send_replace(state);
        }
    }

    /// Send a non-terminal event; false once the stream is closed
    fn emit(&self, event: RenewalEvent) -> bool {
        let guard = self.sender();
        let Some(tx) = guard.as_ref() else {
            return false;
        };

        self.state.send_replace(event.state);
        if tx.send(event).is_err() {
            debug!("renewal event dropped, no receiver");
        }
        true
    }

    /// Send the one terminal event and close the stream
    fn finish(&self, event: RenewalEvent) -> bool {
        let Some(tx) = self.sender().take() else {
            return false;
        };

        self.state.send_replace(event.state);
        if tx.send(event).is_err() {
            debug!("terminal event dropped, no receiver");
        }
        true
    }

    fn stop(&self) -> bool {
        self.cancel.send_replace(true);
        self.finish(RenewalEvent::stopped())
    }
}

/// Ordered stream of renewal outcomes for one lease
///
/// Closes after the terminal event.
pub struct RenewalEvents {
    rx: mpsc::UnboundedReceiver<RenewalEvent>,
}

impl RenewalEvents {
    #[cfg(test)]
    pub(crate) const fn from_receiver(rx: mpsc::UnboundedReceiver<RenewalEvent>) -> Self {
        Self { rx }
    }

    /// Wait for the next event; `None` once the stream is closed
    pub async fn next(&mut self) -> Option<RenewalEvent> {
        self.rx.recv().await
    }

    /// Take an already delivered event without waiting
    pub fn try_next(&mut self) -> Option<RenewalEvent> {
        self.rx.try_recv().ok()
    }

    pub fn into_stream(self) -> impl Stream<Item = RenewalEvent> {
        futures::stream::unfold(self, |mut events| async move {
            events.next().await.map(|event| (event, events))
        })
    }
}

/// Cloneable capability to stop a watcher from any task
#[derive(Clone)]
pub struct StopHandle {
    shared: Arc<Shared>,
}

impl StopHandle {
    /// Stop the watcher
    ///
    /// Idempotent. Emits `Stopped` unless a terminal event was already sent;
    /// no event is emitted after this returns.
    pub fn stop(&self) {
        if self.shared.stop() {
            info!("lease watcher stopped");
        }
    }

    pub fn is_stopped(&self) -> bool {
        *self.shared.cancel.borrow()
    }
}

/// Owner handle of a running watcher task
///
/// Dropping the handle stops the watcher.
pub struct WatcherHandle {
    stopper: StopHandle,
    task: Option<JoinHandle<()>>,
}

impl WatcherHandle {
    pub fn stop(&self) {
        self.stopper.stop();
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stopper.clone()
    }

    /// Current lifecycle state
    pub fn state(&self) -> RenewalState {
        *self.stopper.shared.state.borrow()
    }

    /// Observe state changes, including `Active` and `Renewing`
    pub fn subscribe_state(&self) -> watch::Receiver<RenewalState> {
        self.stopper.shared.state.subscribe()
    }

    /// Stop the watcher and wait up to `grace` for its task to exit
    ///
    /// Returns false if the task had to be aborted.
    pub async fn shutdown(mut self, grace: Duration) -> bool {
        self.stopper.stop();

        let Some(mut task) = self.task.take() else {
            return true;
        };

        if timeout(grace, &mut task).await.is_ok() {
            true
        } else {
            warn!(grace_ms = grace.as_millis(), "lease watcher did not exit in time, aborting");
            task.abort();
            false
        }
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.stopper.stop();
    }
}

/// Starts renewal watchers for issued leases
pub struct LeaseWatcher {
    backend: Arc<dyn SecretsBackend>,
    config: WatcherConfig,
}

impl LeaseWatcher {
    pub fn new(backend: Arc<dyn SecretsBackend>, config: WatcherConfig) -> Self {
        Self { backend, config }
    }

    /// Start watching `lease` on a new task
    ///
    /// Returns immediately. Must be called from within a tokio runtime.
    pub fn start(&self, lease: Lease) -> (RenewalEvents, WatcherHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(RenewalState::Active);
        let (cancel, cancel_rx) = watch::channel(false);

        let shared = Arc::new(Shared {
            events: Mutex::new(Some(tx)),
            state,
            cancel,
        });

        let span = info_span!(
            "lease_watcher",
            watcher_id = %Uuid::new_v4(),
            lease_id = %lease.lease_id,
        );

        let now = Instant::now();
        let watch_loop = WatchLoop {
            backend: Arc::clone(&self.backend),
            config: self.config,
            shared: Arc::clone(&shared),
            cancel_rx,
            granted_at: now,
            expires_at: now + lease.ttl,
            capped: false,
            lease,
        };

        let task = tokio::spawn(watch_loop.run().instrument(span));

        (
            RenewalEvents { rx },
            WatcherHandle {
                stopper: StopHandle { shared },
                task: Some(task),
            },
        )
    }
}

/// Result of one renewal cycle, retries included
enum Outcome {
    Renewed(Duration),
    Exhausted(ExhaustionReason),
    Failed(LeaseError),
    Cancelled,
}

async fn cancelled(cancel_rx: &mut watch::Receiver<bool>) {
    // The sender lives in `Shared`, which the task keeps alive.
    let _ = cancel_rx.wait_for(|stopped| *stopped).await;
}

/// The watcher task; owns the lease exclusively
struct WatchLoop {
    backend: Arc<dyn SecretsBackend>,
    config: WatcherConfig,
    shared: Arc<Shared>,
    cancel_rx: watch::Receiver<bool>,
    lease: Lease,
    granted_at: Instant,
    expires_at: Instant,
    /// Set once a grant stopped extending the lease
    capped: bool,
}

impl WatchLoop {
    async fn run(mut self) {
        info!(
            ttl_secs = self.lease.ttl.as_secs(),
            renewable = self.lease.renewable,
            "lease watcher started"
        );

        loop {
            self.shared.set_state(RenewalState::Active);

            let deadline = self.granted_at + self.config.renewal_delay(self.lease.ttl);
            debug!(
                renew_in_secs = deadline.saturating_duration_since(Instant::now()).as_secs(),
                "renewal scheduled"
            );

            tokio::select! {
                biased;
                () = cancelled(&mut self.cancel_rx) => break,
                () = sleep_until(deadline) => {}
            }

            match self.renew().await {
                Outcome::Renewed(ttl) => {
                    let now = Instant::now();
                    self.capped = self.is_capped(ttl);
                    self.lease.ttl = ttl;
                    self.granted_at = now;
                    self.expires_at = now + ttl;

                    info!(ttl_secs = ttl.as_secs(), "lease renewed");
                    if !self.shared.emit(RenewalEvent::renewed(ttl)) {
                        break;
                    }
                    if self.capped {
                        info!(ttl_secs = ttl.as_secs(), "lease is no longer extended, last grant");
                    }
                }
                Outcome::Exhausted(reason) => {
                    info!(reason = %reason, "lease exhausted");
                    self.shared.finish(RenewalEvent::exhausted(reason));
                    break;
                }
                Outcome::Failed(err) => {
                    error!(error = %err, "lease renewal failed");
                    self.shared.finish(RenewalEvent::failed(err));
                    break;
                }
                Outcome::Cancelled => break,
            }
        }

        debug!("lease watcher exited");
    }

    /// Renew the lease, retrying transient failures within the policy bound
    async fn renew(&mut self) -> Outcome {
        if !self.lease.renewable {
            return Outcome::Exhausted(ExhaustionReason::NotRenewable);
        }
        if self.capped {
            return Outcome::Exhausted(ExhaustionReason::MaxTtlReached);
        }

        let mut attempt = 0;

        loop {
            let remaining = self.expires_at.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(attempt, "lease expired before renewal succeeded");
                return Outcome::Exhausted(ExhaustionReason::Expired);
            }

            // An attempt never outlives the lease itself
            let bound = self.config.request_timeout.min(remaining);
            self.shared.set_state(RenewalState::Renewing);
            let call = timeout(
                bound,
                self.backend.renew(&self.lease.lease_id, self.config.increment),
            );

            let result = tokio::select! {
                biased;
                () = cancelled(&mut self.cancel_rx) => return Outcome::Cancelled,
                result = call => result.unwrap_or(Err(LeaseError::Timeout(bound))),
            };

            let err = match result {
                Ok(RenewResponse::Extended(grant)) => return Self::classify_grant(grant),
                Ok(RenewResponse::Terminal(reason)) => return Outcome::Exhausted(reason),
                Err(err) => err,
            };

            if Instant::now() >= self.expires_at {
                warn!(attempt, error = %err, "lease expired while renewing");
                return Outcome::Exhausted(ExhaustionReason::Expired);
            }

            if !self.config.retry.should_retry(&err, attempt) {
                return Outcome::Failed(err);
            }

            let backoff = self.config.retry.backoff(attempt);
            warn!(
                attempt = attempt + 1,
                max_retries = self.config.retry.max_retries(),
                backoff_ms = backoff.as_millis(),
                error = %err,
                "transient renewal failure, retrying"
            );
            self.shared.set_state(RenewalState::Active);

            tokio::select! {
                biased;
                () = cancelled(&mut self.cancel_rx) => return Outcome::Cancelled,
                () = sleep(backoff) => {}
            }

            attempt += 1;
        }
    }

    /// A grant shorter than the last one, and short of any requested
    /// increment, means the backend has capped the lease
    fn is_capped(&self, ttl: Duration) -> bool {
        ttl < self.lease.ttl && self.config.increment.is_none_or(|increment| ttl < increment)
    }

    fn classify_grant(grant: LeaseGrant) -> Outcome {
        if grant.ttl.is_zero() {
            Outcome::Exhausted(ExhaustionReason::ZeroTtl)
        } else if !grant.renewable {
            Outcome::Exhausted(ExhaustionReason::NotRenewable)
        } else {
            Outcome::Renewed(grant.ttl)
        }
    }
}
