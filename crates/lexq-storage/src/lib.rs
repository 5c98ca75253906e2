//! lexq storage crate - SQLite persistence for conversation history.
//!
//! Provides a WAL-mode SQLite database with per-table migrations and the
//! `HistoryStore` implementation used by the turn handler.

pub mod db;
pub mod history;
pub mod migrations;

pub use db::Database;
pub use history::{SessionSummary, SqliteHistoryStore};
