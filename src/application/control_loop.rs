//! Control loop
//!
//! Dispatches a watcher's renewal events against an external termination
//! signal and decides when the watched session ends. Holds no renewal or
//! scheduling logic of its own.

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::domain::models::{RenewalEvent, RenewalState};
use crate::domain::{ExhaustionReason, LeaseError};
use crate::services::{RenewalEvents, StopHandle};

/// How a watched session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlOutcome {
    /// The watcher acknowledged a stop
    Stopped,
    /// The lease reached the end of its validity window
    Exhausted(ExhaustionReason),
    /// Renewal failed unrecoverably
    Failed(LeaseError),
    /// The watcher did not acknowledge a stop within the grace period
    ShutdownTimedOut,
    /// The event stream closed without a terminal event
    WatcherGone,
}

impl ControlOutcome {
    /// Only `Stopped` and a best-effort shutdown end a session cleanly
    pub fn into_result(self) -> Result<(), LeaseError> {
        match self {
            Self::Stopped | Self::ShutdownTimedOut => Ok(()),
            Self::Exhausted(reason) => Err(LeaseError::LeaseExhausted(reason)),
            Self::Failed(err) => Err(err),
            Self::WatcherGone => Err(LeaseError::WatcherGone),
        }
    }

    fn from_terminal(event: RenewalEvent) -> Self {
        match event.state {
            RenewalState::Exhausted => {
                Self::Exhausted(event.reason.unwrap_or(ExhaustionReason::Expired))
            }
            RenewalState::Failed => Self::Failed(event.error.unwrap_or(LeaseError::WatcherGone)),
            _ => Self::Stopped,
        }
    }
}

/// Single dispatcher over renewal events, termination and stream closure
#[derive(Debug, Clone, Copy)]
pub struct ControlLoop {
    shutdown_grace: Duration,
}

impl ControlLoop {
    pub const fn new(shutdown_grace: Duration) -> Self {
        Self { shutdown_grace }
    }

    /// Run until a terminal event, stream closure, or `termination` resolves
    ///
    /// On termination the watcher is stopped through `stopper` and the loop
    /// waits at most `shutdown_grace` for the terminal event.
    pub async fn run<F>(
        &self,
        events: &mut RenewalEvents,
        stopper: &StopHandle,
        termination: F,
    ) -> ControlOutcome
    where
        F: Future<Output = ()>,
    {
        self.run_with(events, stopper, termination, |_| {}).await
    }

    /// Like [`ControlLoop::run`], handing every received event to `on_event`
    pub async fn run_with<F, O>(
        &self,
        events: &mut RenewalEvents,
        stopper: &StopHandle,
        termination: F,
        mut on_event: O,
    ) -> ControlOutcome
    where
        F: Future<Output = ()>,
        O: FnMut(&RenewalEvent),
    {
        tokio::pin!(termination);

        loop {
            tokio::select! {
                biased;
                event = events.next() => match event {
                    Some(event) => {
                        on_event(&event);
                        if event.is_terminal() {
                            return Self::conclude(event);
                        }
                        Self::observe(&event);
                    }
                    None => {
                        error!("lease watcher event stream closed unexpectedly");
                        return ControlOutcome::WatcherGone;
                    }
                },
                () = &mut termination => {
                    info!("termination requested, stopping lease watcher");
                    stopper.stop();
                    return self.await_terminal(events, &mut on_event).await;
                }
            }
        }
    }

    fn observe(event: &RenewalEvent) {
        match event.state {
            RenewalState::Renewed => info!(
                ttl_secs = event.ttl.map(|ttl| ttl.as_secs()),
                "successfully renewed"
            ),
            state => debug!(state = %state, "renewal state changed"),
        }
    }

    fn conclude(event: RenewalEvent) -> ControlOutcome {
        match event.state {
            RenewalState::Stopped => info!("lease watcher stopped"),
            RenewalState::Exhausted => warn!(
                reason = ?event.reason,
                "lease exhausted, fetch new credentials to continue"
            ),
            state => error!(state = %state, error = ?event.error, "lease renewal failed"),
        }
        ControlOutcome::from_terminal(event)
    }

    async fn await_terminal<O>(
        &self,
        events: &mut RenewalEvents,
        on_event: &mut O,
    ) -> ControlOutcome
    where
        O: FnMut(&RenewalEvent),
    {
        let wait = async {
            while let Some(event) = events.next().await {
                on_event(&event);
                if event.is_terminal() {
                    return Self::conclude(event);
                }
                Self::observe(&event);
            }
            ControlOutcome::WatcherGone
        };

        if let Ok(outcome) = timeout(self.shutdown_grace, wait).await {
            outcome
        } else {
            warn!(
                grace_ms = self.shutdown_grace.as_millis(),
                "lease watcher did not acknowledge stop, shutting down anyway"
            );
            ControlOutcome::ShutdownTimedOut
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::domain::models::{Lease, SecretPayload};
    use crate::infrastructure::mock_backend::{MockSecretsBackend, RenewStep};
    use crate::services::{LeaseWatcher, RetryPolicy, WatcherConfig};

    fn start(
        ttl_secs: u64,
        renewable: bool,
        steps: Vec<RenewStep>,
    ) -> (RenewalEvents, crate::services::WatcherHandle) {
        let lease = Lease::new(
            "db/creds/ro/1",
            Duration::from_secs(ttl_secs),
            renewable,
            SecretPayload::default(),
        );
        let backend = Arc::new(MockSecretsBackend::with_lease(lease.clone()).then(steps));
        let config = WatcherConfig {
            retry: RetryPolicy::new(2, 100, 1_000),
            ..WatcherConfig::default()
        };
        LeaseWatcher::new(backend, config).start(lease)
    }

    #[tokio::test(start_paused = true)]
    async fn test_exits_on_exhaustion() {
        let (mut events, handle) = start(60, false, vec![]);
        let control = ControlLoop::new(Duration::from_secs(5));

        let outcome = control
            .run(&mut events, &handle.stop_handle(), std::future::pending())
            .await;

        assert_eq!(outcome, ControlOutcome::Exhausted(ExhaustionReason::NotRenewable));
        assert_eq!(
            outcome.into_result(),
            Err(LeaseError::LeaseExhausted(ExhaustionReason::NotRenewable))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_keeps_running_through_renewals() {
        let (mut events, handle) = start(
            60,
            true,
            vec![
                RenewStep::extended(Duration::from_secs(60)),
                RenewStep::extended(Duration::from_secs(60)),
                RenewStep::Respond(Err(LeaseError::AuthenticationFailed("denied".to_string()))),
            ],
        );
        let control = ControlLoop::new(Duration::from_secs(5));

        let outcome = control
            .run(&mut events, &handle.stop_handle(), std::future::pending())
            .await;

        assert_eq!(
            outcome,
            ControlOutcome::Failed(LeaseError::AuthenticationFailed("denied".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_termination_stops_watcher_cleanly() {
        let (mut events, handle) = start(600, true, vec![]);
        let control = ControlLoop::new(Duration::from_secs(5));

        let outcome = control
            .run(
                &mut events,
                &handle.stop_handle(),
                tokio::time::sleep(Duration::from_secs(30)),
            )
            .await;

        assert_eq!(outcome, ControlOutcome::Stopped);
        assert!(outcome.into_result().is_ok());
        assert!(events.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_termination_during_renewal_yields_single_stopped() {
        let (mut events, handle) = start(60, true, vec![RenewStep::Hang]);
        let control = ControlLoop::new(Duration::from_secs(5));

        // deadline is at 40s; terminate while the renewal hangs
        let outcome = control
            .run(
                &mut events,
                &handle.stop_handle(),
                tokio::time::sleep(Duration::from_secs(45)),
            )
            .await;

        assert_eq!(outcome, ControlOutcome::Stopped);
        assert!(events.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_event_racing_termination_is_reported() {
        let (mut events, handle) = start(60, false, vec![]);
        let stopper = handle.stop_handle();

        // exhaustion at 40s is already queued when termination is observed
        tokio::time::sleep(Duration::from_secs(41)).await;
        let control = ControlLoop::new(Duration::from_secs(5));
        let outcome = control.run(&mut events, &stopper, async {}).await;

        assert_eq!(outcome, ControlOutcome::Exhausted(ExhaustionReason::NotRenewable));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_closed_without_terminal_event() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<RenewalEvent>();
        drop(tx);
        let (_, handle) = start(600, true, vec![]);
        let mut events = RenewalEvents::from_receiver(rx);
        let control = ControlLoop::new(Duration::from_secs(5));

        let outcome = control
            .run(&mut events, &handle.stop_handle(), std::future::pending())
            .await;

        assert_eq!(outcome, ControlOutcome::WatcherGone);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unacknowledged_stop_times_out() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<RenewalEvent>();
        let (_, handle) = start(600, true, vec![]);
        let mut events = RenewalEvents::from_receiver(rx);
        let control = ControlLoop::new(Duration::from_secs(2));

        let outcome = control.run(&mut events, &handle.stop_handle(), async {}).await;

        assert_eq!(outcome, ControlOutcome::ShutdownTimedOut);
        assert!(outcome.into_result().is_ok());
        drop(tx);
    }

    #[tokio::test(start_paused = true)]
    async fn test_observer_sees_every_event_in_order() {
        let (mut events, handle) = start(
            60,
            true,
            vec![
                RenewStep::extended(Duration::from_secs(60)),
                RenewStep::terminal(ExhaustionReason::Expired),
            ],
        );
        let control = ControlLoop::new(Duration::from_secs(5));
        let mut seen = Vec::new();

        let outcome = control
            .run_with(
                &mut events,
                &handle.stop_handle(),
                std::future::pending(),
                |event| seen.push(event.state),
            )
            .await;

        assert_eq!(outcome, ControlOutcome::Exhausted(ExhaustionReason::Expired));
        assert_eq!(seen, vec![RenewalState::Renewed, RenewalState::Exhausted]);
    }
}
