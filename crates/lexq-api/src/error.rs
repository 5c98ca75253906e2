//! API error types and JSON error response formatting.
//!
//! Every failure leaves the server as `{ "error": <code>, "message": <text> }`
//! with a matching status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use lexq_chat::ChatError;
use lexq_core::error::LexqError;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request", "bad_gateway").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 - malformed request body or parameters.
    BadRequest(String),
    /// 404 - resource does not exist.
    NotFound(String),
    /// 502 - a remote collaborator of the turn failed.
    BadGateway { step: &'static str, message: String },
    /// 500 - unexpected server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::BadGateway { step, message } => (
                StatusCode::BAD_GATEWAY,
                "bad_gateway",
                message,
                Some(serde_json::json!({ "step": step })),
            ),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg, None)
            }
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        let step = match &err {
            ChatError::InvalidEvent(msg) => return ApiError::BadRequest(msg.clone()),
            ChatError::History(_) => return ApiError::Internal(err.to_string()),
            ChatError::Secret(_) => "secret",
            ChatError::Credentials(_) => "credentials",
            ChatError::Rewrite(_) => "rewrite",
            ChatError::QaService(_) => "qa_service",
        };
        ApiError::BadGateway {
            step,
            message: err.to_string(),
        }
    }
}

impl From<LexqError> for ApiError {
    fn from(err: LexqError) -> Self {
        match &err {
            LexqError::Config(msg) => ApiError::BadRequest(msg.clone()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_status_mapping() {
        let cases: Vec<(ChatError, StatusCode)> = vec![
            (ChatError::InvalidEvent("x".into()), StatusCode::BAD_REQUEST),
            (
                ChatError::Secret(LexqError::SecretNotFound { name: "k".into() }),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ChatError::Credentials(LexqError::Credentials("401".into())),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ChatError::Rewrite(LexqError::QaService("x".into())),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ChatError::QaService(LexqError::QaService("x".into())),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ChatError::History(LexqError::Storage("locked".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }

    #[test]
    fn test_bad_gateway_names_step() {
        let err = ApiError::from(ChatError::Credentials(LexqError::Credentials("401".into())));
        match err {
            ApiError::BadGateway { step, message } => {
                assert_eq!(step, "credentials");
                assert!(message.contains("401"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
