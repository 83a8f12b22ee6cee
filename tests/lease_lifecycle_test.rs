/// End-to-end lease lifecycle tests
///
/// Drives fetch, renewal and the control loop against a scripted backend
/// with tokio's paused clock.
use std::sync::Arc;
use std::time::Duration;

use leasekeeper::infrastructure::mock_backend::{MockSecretsBackend, RenewStep};
use leasekeeper::{
    Config, ControlLoop, ControlOutcome, CredentialSession, ExhaustionReason, Lease, LeaseError,
    RenewalState, SecretPayload,
};

fn lease(ttl_secs: u64, renewable: bool) -> Lease {
    let payload: SecretPayload = [("username", "v-billing-ro"), ("password", "pw")]
        .into_iter()
        .collect();
    Lease::new(
        "billing/database/postgres/creds/ro_role/1",
        Duration::from_secs(ttl_secs),
        renewable,
        payload,
    )
}

fn session(backend: &Arc<MockSecretsBackend>) -> CredentialSession {
    CredentialSession::new(backend.clone(), &Config::default())
}

#[tokio::test(start_paused = true)]
async fn test_renewable_lease_renewed_once() {
    let backend = Arc::new(
        MockSecretsBackend::with_lease(lease(600, true))
            .then([RenewStep::extended(Duration::from_secs(600))]),
    );
    let mut watched = session(&backend).fetch_and_watch("billing", "ro").await.unwrap();

    tokio::time::sleep(Duration::from_secs(401)).await;

    let event = watched.events.try_next().expect("one renewal by now");
    assert_eq!(event.state, RenewalState::Renewed);
    assert_eq!(event.ttl, Some(Duration::from_secs(600)));
    assert!(watched.events.try_next().is_none());
    assert_eq!(watched.handle.state(), RenewalState::Active);

    let calls = backend.renew_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].lease_id, "billing/database/postgres/creds/ro_role/1");
}

#[tokio::test(start_paused = true)]
async fn test_non_renewable_lease_exhausts_and_closes() {
    let backend = Arc::new(
        MockSecretsBackend::with_lease(lease(60, false))
            .then([RenewStep::terminal(ExhaustionReason::LeaseNotFound)]),
    );
    let mut watched = session(&backend).fetch_and_watch("billing", "ro").await.unwrap();

    let event = watched.events.next().await.unwrap();
    assert_eq!(event.state, RenewalState::Exhausted);
    assert!(event.reason.is_some());
    assert!(watched.events.next().await.is_none());
    assert_eq!(watched.handle.state(), RenewalState::Exhausted);
}

#[tokio::test(start_paused = true)]
async fn test_control_loop_runs_until_exhaustion() {
    let backend = Arc::new(MockSecretsBackend::with_lease(lease(300, true)).then([
        RenewStep::extended(Duration::from_secs(300)),
        RenewStep::unavailable(),
        RenewStep::extended(Duration::from_secs(300)),
        RenewStep::terminal(ExhaustionReason::Expired),
    ]));
    let mut watched = session(&backend).fetch_and_watch("billing", "ro").await.unwrap();
    let stopper = watched.handle.stop_handle();

    let mut seen = Vec::new();
    let outcome = ControlLoop::new(Duration::from_secs(5))
        .run_with(&mut watched.events, &stopper, std::future::pending(), |event| {
            seen.push(event.state);
        })
        .await;

    assert_eq!(outcome, ControlOutcome::Exhausted(ExhaustionReason::Expired));
    assert_eq!(
        seen,
        vec![RenewalState::Renewed, RenewalState::Renewed, RenewalState::Exhausted]
    );
    assert_eq!(backend.renew_calls().len(), 4);
    assert_eq!(
        outcome.into_result(),
        Err(LeaseError::LeaseExhausted(ExhaustionReason::Expired))
    );
}

#[tokio::test(start_paused = true)]
async fn test_termination_signal_stops_cleanly() {
    let backend = Arc::new(MockSecretsBackend::with_lease(lease(600, true)).then([
        RenewStep::extended(Duration::from_secs(600)),
        RenewStep::extended(Duration::from_secs(600)),
    ]));
    let mut watched = session(&backend).fetch_and_watch("billing", "ro").await.unwrap();
    let stopper = watched.handle.stop_handle();

    // two renewals at 400s and 800s, terminated at 900s
    let mut seen = Vec::new();
    let outcome = ControlLoop::new(Duration::from_secs(5))
        .run_with(
            &mut watched.events,
            &stopper,
            tokio::time::sleep(Duration::from_secs(900)),
            |event| seen.push(event.state),
        )
        .await;

    assert_eq!(outcome, ControlOutcome::Stopped);
    assert_eq!(
        seen,
        vec![RenewalState::Renewed, RenewalState::Renewed, RenewalState::Stopped]
    );
    assert!(watched.handle.shutdown(Duration::from_secs(1)).await);
    assert_eq!(backend.renew_calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_outage_fails_after_retries() {
    let mut config = Config::default();
    config.renewal.max_retries = 2;
    config.renewal.initial_backoff_ms = 1_000;

    let backend = Arc::new(MockSecretsBackend::with_lease(lease(600, true)).then([
        RenewStep::unavailable(),
        RenewStep::unavailable(),
        RenewStep::unavailable(),
    ]));
    let session = CredentialSession::new(backend.clone(), &config);
    let mut watched = session.fetch_and_watch("billing", "ro").await.unwrap();
    let stopper = watched.handle.stop_handle();

    let outcome = ControlLoop::new(Duration::from_secs(5))
        .run(&mut watched.events, &stopper, std::future::pending())
        .await;

    assert!(matches!(
        outcome,
        ControlOutcome::Failed(LeaseError::BackendUnavailable(_))
    ));
    assert_eq!(backend.renew_calls().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failure_starts_no_watcher() {
    let backend = Arc::new(MockSecretsBackend::new(Err(LeaseError::AuthenticationFailed(
        "permission denied".to_string(),
    ))));

    let err = session(&backend).fetch_and_watch("billing", "ro").await.err().unwrap();

    assert_eq!(err, LeaseError::AuthenticationFailed("permission denied".to_string()));
    assert!(backend.renew_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_capped_lease_exhausts_before_expiry() {
    let backend = Arc::new(
        MockSecretsBackend::with_lease(lease(600, true))
            .then([RenewStep::extended(Duration::from_secs(450))]),
    );
    let mut watched = session(&backend).fetch_and_watch("billing", "ro").await.unwrap();
    let stopper = watched.handle.stop_handle();

    let mut ttls = Vec::new();
    let outcome = ControlLoop::new(Duration::from_secs(5))
        .run_with(&mut watched.events, &stopper, std::future::pending(), |event| {
            ttls.extend(event.ttl);
        })
        .await;

    assert_eq!(outcome, ControlOutcome::Exhausted(ExhaustionReason::MaxTtlReached));
    assert_eq!(ttls, vec![Duration::from_secs(450)]);
    assert_eq!(backend.renew_calls().len(), 1);
}
