//! Hosted QA service client.
//!
//! The service exposes a synchronous chat endpoint that takes a single user
//! message, so the system prompt, prior turns and latest question of a
//! [`QaRequest`] are rendered into one transcript-style message.
//!
//! Requests authenticate with the delegated session token (bearer) and the
//! access key id (header). Requests are not signed, so
//! `secret_access_key` is never read and never leaves the process.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use lexq_core::config::QaConfig;
use lexq_core::error::LexqError;
use lexq_core::services::{QaClientFactory, QaServiceClient};
use lexq_core::types::{ChatMessage, Credentials, QaRequest, QaResponse, Role};

use crate::http::{build_client, ensure_success, join_url};

/// Header carrying the delegated access key id.
pub const ACCESS_KEY_HEADER: &str = "x-access-key-id";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatSyncRequest<'a> {
    user_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    conversation_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_message_id: Option<&'a str>,
}

/// Render a request as the transcript sent in `userMessage`.
pub fn render_user_message(request: &QaRequest) -> String {
    let mut lines = Vec::with_capacity(request.history.len() + 2);
    lines.push(format!("System: {}", request.system_prompt));
    lines.extend(request.history.iter().map(render_history_line));
    lines.push(format!("Human: {}", request.question));
    lines.join("\n")
}

fn render_history_line(message: &ChatMessage) -> String {
    match message.role {
        Role::User => format!("Human: {}", message.content),
        Role::Assistant => format!("AI: {}", message.content),
    }
}

/// Builds [`HttpQaClient`]s bound to one application.
#[derive(Debug, Clone)]
pub struct HttpQaClientFactory {
    endpoint: String,
    application_id: String,
    timeout_secs: u64,
}

impl HttpQaClientFactory {
    pub fn new(config: &QaConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            application_id: config.application_id.clone(),
            timeout_secs: config.request_timeout_secs,
        }
    }
}

impl QaClientFactory for HttpQaClientFactory {
    fn connect(&self, credentials: &Credentials) -> Result<Box<dyn QaServiceClient>, LexqError> {
        let client = build_client(self.timeout_secs)
            .map_err(|e| LexqError::QaService(format!("failed to build HTTP client: {}", e)))?;
        Ok(Box::new(HttpQaClient {
            url: join_url(
                &self.endpoint,
                &format!("applications/{}/conversations?sync", self.application_id),
            ),
            credentials: credentials.clone(),
            client,
        }))
    }
}

/// QA client holding one set of delegated credentials.
pub struct HttpQaClient {
    url: String,
    credentials: Credentials,
    client: Client,
}

#[async_trait]
impl QaServiceClient for HttpQaClient {
    async fn chat(&self, request: QaRequest) -> Result<QaResponse, LexqError> {
        let body = ChatSyncRequest {
            user_message: render_user_message(&request),
            conversation_id: request.conversation_id.as_deref(),
            parent_message_id: request.parent_message_id.as_deref(),
        };

        debug!(
            url = %self.url,
            history_len = request.history.len(),
            continuing = request.conversation_id.is_some(),
            "Calling QA service"
        );

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.credentials.session_token)
            .header(ACCESS_KEY_HEADER, &self.credentials.access_key_id)
            .json(&body)
            .send()
            .await
            .map_err(|e| LexqError::QaService(format!("request failed: {}", e)))?;

        let response = ensure_success(response, LexqError::QaService).await?;

        let raw: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LexqError::QaService(format!("invalid response body: {}", e)))?;

        let text = raw
            .get("systemMessage")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                LexqError::QaService("response is missing 'systemMessage'".to_string())
            })?
            .to_string();

        Ok(QaResponse { text, raw })
    }
}
