use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, Response};
use tracing::{debug, instrument, warn};

use super::errors::VaultApiError;
use super::types::{RenewRequest, SecretResponse};
use crate::domain::models::{BackendConfig, Lease, LeaseGrant, RenewResponse, SecretPayload};
use crate::domain::ports::SecretsBackend;
use crate::domain::{ExhaustionReason, LeaseError};

/// Configuration for the Vault HTTP client
#[derive(Debug, Clone)]
pub struct VaultClientConfig {
    /// Base address of the Vault server, e.g. `https://vault.internal:8200`
    pub address: String,

    /// Token sent as `X-Vault-Token`
    pub token: String,

    /// Secret path template with `{service}` and `{role}` placeholders
    pub secret_path_template: String,

    /// Request timeout
    pub timeout: Duration,
}

impl VaultClientConfig {
    /// Build client settings from the backend section of the configuration
    pub fn from_backend(backend: &BackendConfig) -> Result<Self, LeaseError> {
        let token = backend
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| LeaseError::Configuration("a Vault token is required".to_string()))?;

        Ok(Self {
            address: backend.address.clone(),
            token,
            secret_path_template: backend.secret_path_template.clone(),
            timeout: backend.request_timeout(),
        })
    }
}

/// HTTP client for the two Vault endpoints the lease manager needs
///
/// - `GET /v1/<secret path>` issues a dynamic secret
/// - `PUT /v1/sys/leases/renew` extends its lease
pub struct VaultClient {
    http_client: ReqwestClient,
    address: String,
    token: String,
    secret_path_template: String,
    timeout: Duration,
}

impl VaultClient {
    pub fn new(config: VaultClientConfig) -> Result<Self, LeaseError> {
        let http_client = ReqwestClient::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(2)
            .build()
            .map_err(|e| LeaseError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            address: config.address.trim_end_matches('/').to_string(),
            token: config.token,
            secret_path_template: config.secret_path_template,
            timeout: config.timeout,
        })
    }

    fn secret_path(&self, service: &str, role: &str) -> String {
        self.secret_path_template
            .replace("{service}", service)
            .replace("{role}", role)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.address, path.trim_start_matches('/'))
    }

    fn transport_error(&self, err: reqwest::Error) -> VaultApiError {
        if err.is_timeout() {
            VaultApiError::Timeout(self.timeout)
        } else {
            VaultApiError::NetworkError(err)
        }
    }

    /// Check the status code and parse the secret body
    async fn read_secret(&self, response: Response) -> Result<SecretResponse, VaultApiError> {
        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(VaultApiError::from_status(status, &body));
        }

        Ok(serde_json::from_str(&body)?)
    }

    async fn read_path(&self, path: &str) -> Result<SecretResponse, VaultApiError> {
        let response = self
            .http_client
            .get(self.url(path))
            .header("X-Vault-Token", &self.token)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.read_secret(response).await
    }

    async fn renew_lease(
        &self,
        lease_id: &str,
        increment: Option<Duration>,
    ) -> Result<SecretResponse, VaultApiError> {
        let body = RenewRequest {
            lease_id,
            increment: increment.map(|d| d.as_secs()),
        };

        let response = self
            .http_client
            .put(self.url("sys/leases/renew"))
            .header("X-Vault-Token", &self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.read_secret(response).await
    }
}

/// Recognise Vault's lease-level rejections of a renewal
fn terminal_reason(err: &VaultApiError) -> Option<ExhaustionReason> {
    match err {
        VaultApiError::NotFound(_) => Some(ExhaustionReason::LeaseNotFound),
        VaultApiError::BadRequest(msg) => {
            let msg = msg.to_lowercase();
            if msg.contains("not renewable") {
                Some(ExhaustionReason::NotRenewable)
            } else if msg.contains("lease not found") || msg.contains("invalid lease") {
                Some(ExhaustionReason::LeaseNotFound)
            } else {
                None
            }
        }
        _ => None,
    }
}

#[async_trait]
impl SecretsBackend for VaultClient {
    #[instrument(skip(self))]
    async fn issue(&self, service: &str, role: &str) -> Result<Lease, LeaseError> {
        let path = self.secret_path(service, role);
        let secret = self.read_path(&path).await.map_err(|err| {
            warn!(path = %path, error = %err, "secret read failed");
            LeaseError::from(err)
        })?;

        debug!(
            lease_id = %secret.lease_id,
            ttl_secs = secret.lease_duration,
            renewable = secret.renewable,
            "secret issued"
        );

        Ok(Lease::new(
            secret.lease_id,
            Duration::from_secs(secret.lease_duration),
            secret.renewable,
            SecretPayload::new(secret.data.unwrap_or_default()),
        ))
    }

    #[instrument(skip(self))]
    async fn renew(
        &self,
        lease_id: &str,
        increment: Option<Duration>,
    ) -> Result<RenewResponse, LeaseError> {
        match self.renew_lease(lease_id, increment).await {
            Ok(secret) => Ok(RenewResponse::Extended(LeaseGrant {
                ttl: Duration::from_secs(secret.lease_duration),
                renewable: secret.renewable,
            })),
            Err(err) => match terminal_reason(&err) {
                Some(reason) => {
                    debug!(error = %err, reason = %reason, "lease can no longer be renewed");
                    Ok(RenewResponse::Terminal(reason))
                }
                None => Err(err.into()),
            },
        }
    }
}
