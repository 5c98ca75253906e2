//! Shared domain types: chat messages, delegated credentials, QA service
//! request/response, and run records.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LexqError, Result};

/// Session attributes carried by the dialog platform between turns.
pub type SessionAttributes = HashMap<String, String>;

/// Reserved attribute holding the QA service's conversation id.
pub const CONVERSATION_ID_KEY: &str = "conversationId";

/// Reserved attribute holding the QA service's last system message id.
pub const MESSAGE_ID_KEY: &str = "messageId";

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// One stored message in a session's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Short-lived delegated credentials for the QA service.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    #[serde(default)]
    pub expiration: Option<DateTime<Utc>>,
}

impl Credentials {
    /// Whether the credentials have passed their expiration time.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration.is_some_and(|exp| exp <= now)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// A prompt-style request to the hosted QA service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QaRequest {
    /// Instructions framing how the service should respond.
    pub system_prompt: String,
    /// Prior messages of the conversation, oldest first.
    pub history: Vec<ChatMessage>,
    /// The latest question.
    pub question: String,
    /// Continue an existing service-side conversation.
    pub conversation_id: Option<String>,
    /// The system message the new question follows up on.
    pub parent_message_id: Option<String>,
}

/// The QA service's reply: generated text plus the raw response object.
#[derive(Debug, Clone, PartialEq)]
pub struct QaResponse {
    pub text: String,
    pub raw: serde_json::Value,
}

impl QaResponse {
    /// The service-side conversation id carried in the raw response.
    pub fn conversation_id(&self) -> Result<&str> {
        self.raw_str("conversationId")
    }

    /// The id of the system message that carried this reply.
    pub fn system_message_id(&self) -> Result<&str> {
        self.raw_str("systemMessageId")
    }

    fn raw_str(&self, field: &str) -> Result<&str> {
        self.raw
            .get(field)
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                LexqError::QaService(format!("response is missing '{}'", field))
            })
    }
}

/// One traced call recorded by a [`crate::services::RunTracer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: Uuid,
    pub name: String,
    pub session_id: String,
    pub inputs: serde_json::Value,
    pub outputs: serde_json::Value,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}
