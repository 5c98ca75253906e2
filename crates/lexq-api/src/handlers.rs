//! Route handler functions for all API endpoints.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use lexq_chat::{DialogEvent, DialogResponse};
use lexq_core::services::HistoryStore;
use lexq_core::types::ChatMessage;
use lexq_storage::SessionSummary;

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionsResponse {
    pub sessions: Vec<SessionSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearResponse {
    pub session_id: String,
    pub deleted: usize,
}

#[derive(Debug, Deserialize)]
pub struct SessionsParams {
    pub limit: Option<u64>,
}

const DEFAULT_SESSION_LIMIT: u64 = 100;
const MAX_SESSION_LIMIT: u64 = 1000;

// =============================================================================
// Handlers
// =============================================================================

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// POST /invoke - run one dialog turn.
///
/// The body is parsed here rather than through `Json` so that malformed
/// events produce the same JSON error body as every other failure.
pub async fn invoke(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<DialogResponse>, ApiError> {
    let value: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {}", e)))?;
    let event = DialogEvent::from_json(value)?;

    match state.handler.handle_event(&event).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            if e.is_upstream() {
                tracing::warn!(session_id = %event.session_id, error = %e, "Upstream failure");
            } else {
                tracing::error!(session_id = %event.session_id, error = %e, "Turn failed");
            }
            Err(e.into())
        }
    }
}

/// GET /sessions?limit=N - most recently active sessions.
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(params): Query<SessionsParams>,
) -> Result<Json<SessionsResponse>, ApiError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_SESSION_LIMIT)
        .clamp(1, MAX_SESSION_LIMIT);
    let sessions = state.history.list_sessions(limit)?;
    Ok(Json(SessionsResponse { sessions }))
}

/// GET /sessions/{id}/history
pub async fn session_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let messages = state.history.messages(&session_id).await?;
    if messages.is_empty() {
        return Err(ApiError::NotFound(format!(
            "no history for session {}",
            session_id
        )));
    }
    Ok(Json(HistoryResponse {
        session_id,
        messages,
    }))
}

/// DELETE /sessions/{id}/history
pub async fn clear_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ClearResponse>, ApiError> {
    let deleted = state.history.clear(&session_id)?;
    if deleted == 0 {
        return Err(ApiError::NotFound(format!(
            "no history for session {}",
            session_id
        )));
    }
    tracing::info!(session_id = %session_id, deleted, "Session history cleared");
    Ok(Json(ClearResponse {
        session_id,
        deleted,
    }))
}
