//! lexq HTTP surface.
//!
//! Receives dialog platform invocations on `/invoke`, runs the turn and
//! returns the response envelope. Also exposes operator endpoints over the
//! stored conversation history.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
