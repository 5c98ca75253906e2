//! Error types for the turn handler.
//!
//! Each variant names the step of the turn that failed and keeps the
//! underlying `LexqError` as its source.

use lexq_core::error::LexqError;

/// Errors that abort a turn.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("invalid dialog event: {0}")]
    InvalidEvent(String),
    #[error("secret retrieval failed: {0}")]
    Secret(#[source] LexqError),
    #[error("credential exchange failed: {0}")]
    Credentials(#[source] LexqError),
    #[error("history store failed: {0}")]
    History(#[source] LexqError),
    #[error("question rewrite failed: {0}")]
    Rewrite(#[source] LexqError),
    #[error("QA service failed: {0}")]
    QaService(#[source] LexqError),
}

impl ChatError {
    /// Whether the failure came from a remote collaborator rather than from
    /// the request itself or local storage.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ChatError::Secret(_)
                | ChatError::Credentials(_)
                | ChatError::Rewrite(_)
                | ChatError::QaService(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_chat_error_display() {
        let err = ChatError::InvalidEvent("missing sessionId".to_string());
        assert_eq!(err.to_string(), "invalid dialog event: missing sessionId");

        let err = ChatError::Secret(LexqError::SecretNotFound {
            name: "/bot/key".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "secret retrieval failed: Secret parameter not found: /bot/key"
        );

        let err = ChatError::Credentials(LexqError::Credentials("HTTP 401".to_string()));
        assert_eq!(
            err.to_string(),
            "credential exchange failed: Credential exchange error: HTTP 401"
        );

        let err = ChatError::History(LexqError::Storage("locked".to_string()));
        assert_eq!(err.to_string(), "history store failed: Storage error: locked");

        let err = ChatError::QaService(LexqError::QaService("throttled".to_string()));
        assert_eq!(err.to_string(), "QA service failed: QA service error: throttled");
    }

    #[test]
    fn test_source_is_preserved() {
        let err = ChatError::Rewrite(LexqError::QaService("timeout".to_string()));
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "QA service error: timeout");
    }

    #[test]
    fn test_is_upstream() {
        assert!(ChatError::Secret(LexqError::Secret("x".into())).is_upstream());
        assert!(ChatError::Credentials(LexqError::Credentials("x".into())).is_upstream());
        assert!(ChatError::Rewrite(LexqError::QaService("x".into())).is_upstream());
        assert!(ChatError::QaService(LexqError::QaService("x".into())).is_upstream());
        assert!(!ChatError::History(LexqError::Storage("x".into())).is_upstream());
        assert!(!ChatError::InvalidEvent("x".into()).is_upstream());
    }
}
