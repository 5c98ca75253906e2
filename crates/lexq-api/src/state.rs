//! Application state shared across route handlers.

use std::sync::Arc;
use std::time::Instant;

use lexq_chat::TurnHandler;
use lexq_core::config::LexqConfig;
use lexq_storage::SqliteHistoryStore;

/// Shared application state, passed to handlers via axum's `State`
/// extractor.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration, read-only after startup.
    pub config: Arc<LexqConfig>,
    /// Runs one dialog turn per `/invoke` request.
    pub handler: Arc<TurnHandler>,
    /// History store, read directly by the operator endpoints.
    pub history: Arc<SqliteHistoryStore>,
    /// Bearer token required on protected routes.
    pub api_token: String,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: LexqConfig,
        handler: TurnHandler,
        history: Arc<SqliteHistoryStore>,
        api_token: String,
    ) -> Self {
        Self {
            config: Arc::new(config),
            handler: Arc::new(handler),
            history,
            api_token,
            start_time: Instant::now(),
        }
    }
}
