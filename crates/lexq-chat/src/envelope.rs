//! Dialog platform wire types.
//!
//! `DialogEvent` is the inbound invocation payload; `DialogResponse` is the
//! fixed-shape envelope the platform expects back. Field names follow the
//! platform's camelCase JSON.

use serde::{Deserialize, Serialize};

use lexq_core::types::SessionAttributes;

use crate::error::ChatError;

// =============================================================================
// Inbound
// =============================================================================

/// One invocation from the dialog platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogEvent {
    pub session_id: String,
    pub input_transcript: String,
    pub session_state: EventSessionState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSessionState {
    pub intent: EventIntent,
    /// The platform sends `null` or omits this on the first turn.
    #[serde(default)]
    pub session_attributes: Option<SessionAttributes>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventIntent {
    pub name: String,
}

impl DialogEvent {
    /// Parse an event from raw JSON.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ChatError> {
        serde_json::from_value(value).map_err(|e| ChatError::InvalidEvent(e.to_string()))
    }

    pub fn intent_name(&self) -> &str {
        &self.session_state.intent.name
    }

    /// Session attributes carried in from the previous turn, or empty.
    pub fn session_attributes(&self) -> SessionAttributes {
        self.session_state
            .session_attributes
            .clone()
            .unwrap_or_default()
    }
}

// =============================================================================
// Outbound
// =============================================================================

/// Response envelope returned to the dialog platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogResponse {
    pub session_state: ResponseSessionState,
    pub messages: Vec<ResponseMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSessionState {
    pub session_attributes: SessionAttributes,
    pub dialog_action: DialogAction,
    pub intent: ResponseIntent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogAction {
    #[serde(rename = "type")]
    pub kind: DialogActionType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogActionType {
    ElicitIntent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseIntent {
    pub name: String,
    pub state: IntentState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentState {
    Fulfilled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMessage {
    pub content_type: MessageContentType,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageContentType {
    PlainText,
}

impl DialogResponse {
    /// Wrap a reply: the intent is marked fulfilled and the platform is
    /// asked to elicit the next intent.
    pub fn fulfilled(
        intent_name: &str,
        reply: &str,
        session_attributes: SessionAttributes,
    ) -> Self {
        Self {
            session_state: ResponseSessionState {
                session_attributes,
                dialog_action: DialogAction {
                    kind: DialogActionType::ElicitIntent,
                },
                intent: ResponseIntent {
                    name: intent_name.to_string(),
                    state: IntentState::Fulfilled,
                },
            },
            messages: vec![ResponseMessage {
                content_type: MessageContentType::PlainText,
                content: reply.to_string(),
            }],
        }
    }
}
