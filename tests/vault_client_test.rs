/// Integration tests for the Vault HTTP client
///
/// These tests run the client against a mock HTTP server.
///
/// Test coverage:
/// - Secret issuance and header/path wiring
/// - Error classification for issuance (403, 404, 5xx, malformed body)
/// - Lease renewal, increment forwarding and terminal rejections
/// - Renewal driven by a live watcher against the mock server
use std::time::Duration;

use leasekeeper::domain::models::RenewalState;
use leasekeeper::{
    CredentialSession, ExhaustionReason, LeaseError, RenewResponse, RetryPolicy, SecretsBackend,
    VaultClient, VaultClientConfig, WatcherConfig,
};
use mockito::{Matcher, Server};
use serde_json::json;
use std::sync::Arc;

const TOKEN: &str = "s.integration";
const SECRET_PATH: &str = "/v1/billing/database/postgres/creds/ro_role";

fn client(server: &Server) -> VaultClient {
    VaultClient::new(VaultClientConfig {
        address: server.url(),
        token: TOKEN.to_string(),
        secret_path_template: "{service}/database/postgres/creds/{role}_role".to_string(),
        timeout: Duration::from_secs(5),
    })
    .expect("Failed to create client")
}

fn secret_body(lease_duration: u64, renewable: bool) -> String {
    json!({
        "request_id": "0f7d2a7e",
        "lease_id": "billing/database/postgres/creds/ro_role/h3Xq",
        "renewable": renewable,
        "lease_duration": lease_duration,
        "data": {
            "username": "v-token-ro_role-8sd7",
            "password": "A1a-9dkf83"
        },
        "wrap_info": null,
        "warnings": null,
        "auth": null
    })
    .to_string()
}

fn errors_body(message: &str) -> String {
    json!({ "errors": [message] }).to_string()
}

#[tokio::test]
async fn test_issue_success() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", SECRET_PATH)
        .match_header("x-vault-token", TOKEN)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(secret_body(3600, true))
        .create_async()
        .await;

    let lease = client(&server).issue("billing", "ro").await.unwrap();

    mock.assert_async().await;
    assert_eq!(lease.lease_id, "billing/database/postgres/creds/ro_role/h3Xq");
    assert_eq!(lease.ttl, Duration::from_secs(3600));
    assert!(lease.renewable);
    assert_eq!(lease.payload.get("username").unwrap(), "v-token-ro_role-8sd7");
    assert_eq!(lease.payload.get("password").unwrap(), "A1a-9dkf83");
}

#[tokio::test]
async fn test_issue_permission_denied() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", SECRET_PATH)
        .with_status(403)
        .with_body(errors_body("permission denied"))
        .create_async()
        .await;

    let err = client(&server).issue("billing", "ro").await.unwrap_err();
    assert_eq!(err, LeaseError::AuthenticationFailed("permission denied".to_string()));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_issue_unknown_role() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/v1/billing/database/postgres/creds/xx_role")
        .with_status(404)
        .with_body(errors_body("unknown role: xx_role"))
        .create_async()
        .await;

    let err = client(&server).issue("billing", "xx").await.unwrap_err();
    assert!(matches!(err, LeaseError::NotFound(ref msg) if msg.contains("xx_role")));
}

#[tokio::test]
async fn test_issue_server_error_is_backend_unavailable() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", SECRET_PATH)
        .with_status(503)
        .with_body(errors_body("Vault is sealed"))
        .create_async()
        .await;

    let err = client(&server).issue("billing", "ro").await.unwrap_err();
    assert!(matches!(err, LeaseError::BackendUnavailable(ref msg) if msg.contains("sealed")));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_issue_malformed_body() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", SECRET_PATH)
        .with_status(200)
        .with_body("<html>proxy login</html>")
        .create_async()
        .await;

    let err = client(&server).issue("billing", "ro").await.unwrap_err();
    assert!(matches!(err, LeaseError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_issue_unreachable_backend() {
    // Nothing listens on the discard port
    let client = VaultClient::new(VaultClientConfig {
        address: "http://127.0.0.1:9".to_string(),
        token: TOKEN.to_string(),
        secret_path_template: "{service}/creds/{role}".to_string(),
        timeout: Duration::from_secs(2),
    })
    .unwrap();

    let err = client.issue("billing", "ro").await.unwrap_err();
    assert!(err.is_retryable(), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_renew_success_forwards_increment() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PUT", "/v1/sys/leases/renew")
        .match_header("x-vault-token", TOKEN)
        .match_body(Matcher::Json(json!({
            "lease_id": "billing/database/postgres/creds/ro_role/h3Xq",
            "increment": 1800
        })))
        .with_status(200)
        .with_body(
            json!({
                "lease_id": "billing/database/postgres/creds/ro_role/h3Xq",
                "renewable": true,
                "lease_duration": 1800,
                "data": null
            })
            .to_string(),
        )
        .create_async()
        .await;

    let response = client(&server)
        .renew(
            "billing/database/postgres/creds/ro_role/h3Xq",
            Some(Duration::from_secs(1800)),
        )
        .await
        .unwrap();

    mock.assert_async().await;
    let RenewResponse::Extended(grant) = response else {
        panic!("expected an extension, got {response:?}");
    };
    assert_eq!(grant.ttl, Duration::from_secs(1800));
    assert!(grant.renewable);
}

#[tokio::test]
async fn test_renew_without_increment_omits_field() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PUT", "/v1/sys/leases/renew")
        .match_body(Matcher::Json(json!({ "lease_id": "lease/1" })))
        .with_status(200)
        .with_body(json!({ "lease_id": "lease/1", "renewable": true, "lease_duration": 60 }).to_string())
        .create_async()
        .await;

    client(&server).renew("lease/1", None).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_renew_rejections_are_terminal() {
    let mut server = Server::new_async().await;
    let _gone = server
        .mock("PUT", "/v1/sys/leases/renew")
        .match_body(Matcher::PartialJson(json!({ "lease_id": "lease/gone" })))
        .with_status(400)
        .with_body(errors_body("lease not found"))
        .create_async()
        .await;
    let _fixed = server
        .mock("PUT", "/v1/sys/leases/renew")
        .match_body(Matcher::PartialJson(json!({ "lease_id": "lease/fixed" })))
        .with_status(400)
        .with_body(errors_body("lease is not renewable"))
        .create_async()
        .await;

    let client = client(&server);
    assert_eq!(
        client.renew("lease/gone", None).await,
        Ok(RenewResponse::Terminal(ExhaustionReason::LeaseNotFound))
    );
    assert_eq!(
        client.renew("lease/fixed", None).await,
        Ok(RenewResponse::Terminal(ExhaustionReason::NotRenewable))
    );
}

#[tokio::test]
async fn test_renew_server_error_is_retryable() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("PUT", "/v1/sys/leases/renew")
        .with_status(500)
        .with_body(errors_body("internal error"))
        .create_async()
        .await;

    let err = client(&server).renew("lease/1", None).await.unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_session_renews_against_server() {
    let mut server = Server::new_async().await;
    let _issue = server
        .mock("GET", SECRET_PATH)
        .with_status(200)
        .with_body(secret_body(1, true))
        .create_async()
        .await;
    let renew = server
        .mock("PUT", "/v1/sys/leases/renew")
        .match_header("x-vault-token", TOKEN)
        .with_status(200)
        .with_body(secret_body(1, true))
        .expect_at_least(2)
        .create_async()
        .await;

    let config = WatcherConfig {
        retry: RetryPolicy::new(0, 10, 10),
        ..WatcherConfig::default()
    };
    let session =
        CredentialSession::with_settings(Arc::new(client(&server)), Duration::from_secs(5), config);
    let mut watched = session.fetch_and_watch("billing", "ro").await.unwrap();

    // 1s ttl renews roughly every 667ms
    for _ in 0..2 {
        let event = tokio::time::timeout(Duration::from_secs(5), watched.events.next())
            .await
            .expect("renewal should arrive")
            .expect("stream should stay open");
        assert_eq!(event.state, RenewalState::Renewed);
        assert_eq!(event.ttl, Some(Duration::from_secs(1)));
    }

    watched.stop();
    let last = watched.events.next().await.unwrap();
    assert_eq!(last.state, RenewalState::Stopped);
    assert!(watched.events.next().await.is_none());
    renew.assert_async().await;
}
