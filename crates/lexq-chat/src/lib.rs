//! Turn handling for lexq.
//!
//! Parses dialog platform events, runs the per-turn orchestration against
//! the secret store, credential exchange, QA service and history store, and
//! builds the response envelope.

pub mod envelope;
pub mod error;
pub mod orchestrator;
pub mod prompt;

pub use envelope::{DialogEvent, DialogResponse};
pub use error::ChatError;
pub use orchestrator::{
    merge_session_attributes, TurnHandler, TurnOutcome, TurnServices, TurnSettings,
};
