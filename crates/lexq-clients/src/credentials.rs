//! Delegated credential exchange against a token vending service.
//!
//! The service authenticates the calling application by client id/secret
//! and returns short-lived credentials scoped to one role and one user
//! identity. Nothing is cached: every call performs a fresh exchange.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use lexq_core::config::CredentialsConfig;
use lexq_core::error::LexqError;
use lexq_core::services::CredentialProvider;
use lexq_core::types::Credentials;

use crate::http::{build_client, ensure_success, join_url};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    role_arn: &'a str,
    region: &'a str,
    email: &'a str,
}

/// `CredentialProvider` backed by a token vending HTTP endpoint.
pub struct TokenVendingClient {
    issuer_url: String,
    client_id: String,
    client_secret: String,
    role_arn: String,
    region: String,
    client: Client,
}

impl TokenVendingClient {
    pub fn new(config: &CredentialsConfig) -> Result<Self, LexqError> {
        let client = build_client(config.request_timeout_secs)
            .map_err(|e| LexqError::Credentials(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            issuer_url: config.issuer_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            role_arn: config.role_arn.clone(),
            region: config.region.clone(),
            client,
        })
    }
}

impl std::fmt::Debug for TokenVendingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVendingClient")
            .field("issuer_url", &self.issuer_url)
            .field("client_id", &self.client_id)
            .field("role_arn", &self.role_arn)
            .field("region", &self.region)
            .finish()
    }
}

#[async_trait]
impl CredentialProvider for TokenVendingClient {
    async fn credentials(&self, identity: &str) -> Result<Credentials, LexqError> {
        let url = join_url(&self.issuer_url, "credentials");
        debug!(url = %url, role_arn = %self.role_arn, "Exchanging identity for credentials");

        let body = ExchangeRequest {
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            role_arn: &self.role_arn,
            region: &self.region,
            email: identity,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LexqError::Credentials(format!("request failed: {}", e)))?;

        let response = ensure_success(response, LexqError::Credentials).await?;

        let credentials: Credentials = response
            .json()
            .await
            .map_err(|e| LexqError::Credentials(format!("invalid response body: {}", e)))?;

        info!(expiration = ?credentials.expiration, "Delegated credentials issued");
        Ok(credentials)
    }
}
