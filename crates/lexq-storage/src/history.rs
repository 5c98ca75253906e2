//! SQLite-backed conversation history.
//!
//! Messages are ordered by a per-session sequence number assigned at
//! insert time, so read order always equals append order.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use lexq_core::error::LexqError;
use lexq_core::services::HistoryStore;
use lexq_core::types::{ChatMessage, Role};

use crate::db::Database;
use crate::migrations;

/// Per-session overview for operator tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub message_count: u64,
    pub last_message_at: DateTime<Utc>,
}

/// History store persisting chat messages in one SQLite table.
pub struct SqliteHistoryStore {
    db: Arc<Database>,
    table: String,
    /// `table`, quoted for SQL text.
    sql_table: String,
}

impl SqliteHistoryStore {
    /// Open the store on `table`, creating it if needed.
    pub fn new(db: Arc<Database>, table: &str) -> Result<Self, LexqError> {
        db.with_conn(|conn| migrations::run_migrations(conn, table))?;
        Ok(Self {
            db,
            table: table.to_string(),
            sql_table: migrations::quote_ident(table),
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// List sessions with stored history, most recently active first.
    pub fn list_sessions(&self, limit: u64) -> Result<Vec<SessionSummary>, LexqError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT session_id, COUNT(*), MAX(created_at)
                     FROM {}
                     GROUP BY session_id
                     ORDER BY MAX(created_at) DESC
                     LIMIT ?1",
                    self.sql_table
                ))
                .map_err(|e| LexqError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![limit], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                })
                .map_err(|e| LexqError::Storage(e.to_string()))?;

            let mut sessions = Vec::new();
            for row in rows {
                let (session_id, count, last) =
                    row.map_err(|e| LexqError::Storage(e.to_string()))?;
                sessions.push(SessionSummary {
                    session_id,
                    message_count: count as u64,
                    last_message_at: millis_to_datetime(last)?,
                });
            }
            Ok(sessions)
        })
    }

    /// Delete a session's history. Returns the number of messages removed.
    pub fn clear(&self, session_id: &str) -> Result<usize, LexqError> {
        self.db.with_conn(|conn| {
            conn.execute(
                &format!("DELETE FROM {} WHERE session_id = ?1", self.sql_table),
                rusqlite::params![session_id],
            )
            .map_err(|e| LexqError::Storage(format!("Failed to clear history: {}", e)))
        })
    }

    fn insert(
        &self,
        conn: &Connection,
        session_id: &str,
        role: Role,
        content: &str,
    ) -> Result<(), LexqError> {
        conn.execute(
            &format!(
                "INSERT INTO {t} (session_id, seq, role, content, created_at)
                 SELECT ?1, COALESCE(MAX(seq), 0) + 1, ?2, ?3, ?4
                 FROM {t} WHERE session_id = ?1",
                t = self.sql_table
            ),
            rusqlite::params![
                session_id,
                role.to_string(),
                content,
                Utc::now().timestamp_millis(),
            ],
        )
        .map_err(|e| LexqError::Storage(format!("Failed to append message: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, LexqError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT role, content, created_at
                     FROM {}
                     WHERE session_id = ?1
                     ORDER BY seq ASC",
                    self.sql_table
                ))
                .map_err(|e| LexqError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![session_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                })
                .map_err(|e| LexqError::Storage(e.to_string()))?;

            let mut messages = Vec::new();
            for row in rows {
                let (role, content, created_at) =
                    row.map_err(|e| LexqError::Storage(e.to_string()))?;
                messages.push(ChatMessage {
                    role: role.parse::<Role>().map_err(LexqError::Storage)?,
                    content,
                    created_at: millis_to_datetime(created_at)?,
                });
            }
            Ok(messages)
        })
    }

    async fn append_message(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
    ) -> Result<(), LexqError> {
        self.db
            .with_conn(|conn| self.insert(conn, session_id, role, content))
    }

    async fn append_turn(
        &self,
        session_id: &str,
        user: &str,
        assistant: &str,
    ) -> Result<(), LexqError> {
        self.db.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| LexqError::Storage(format!("Failed to begin transaction: {}", e)))?;
            self.insert(&tx, session_id, Role::User, user)?;
            self.insert(&tx, session_id, Role::Assistant, assistant)?;
            tx.commit()
                .map_err(|e| LexqError::Storage(format!("Failed to commit turn: {}", e)))?;
            tracing::debug!(session_id = %session_id, "Turn appended to history");
            Ok(())
        })
    }
}

fn millis_to_datetime(millis: i64) -> Result<DateTime<Utc>, LexqError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| LexqError::Storage(format!("invalid timestamp: {}", millis)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store() -> SqliteHistoryStore {
        let db = Arc::new(Database::in_memory().unwrap());
        SqliteHistoryStore::new(db, "conversation_history").unwrap()
    }

    #[tokio::test]
    async fn test_unknown_session_is_empty() {
        let store = make_store();
        let messages = store.messages("never-seen").await.unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn test_append_turn_preserves_order() {
        let store = make_store();
        store
            .append_turn("s1", "What is X?", "X is Y.")
            .await
            .unwrap();
        store
            .append_turn("s1", "And Z?", "Z is W.")
            .await
            .unwrap();

        let messages = store.messages("s1").await.unwrap();
        let pairs: Vec<(Role, &str)> = messages
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (Role::User, "What is X?"),
                (Role::Assistant, "X is Y."),
                (Role::User, "And Z?"),
                (Role::Assistant, "Z is W."),
            ]
        );
    }

    #[tokio::test]
    async fn test_append_message_single() {
        let store = make_store();
        store.append_message("s1", Role::User, "hello").await.unwrap();
        let messages = store.messages("s1").await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = make_store();
        store.append_turn("a", "qa", "ra").await.unwrap();
        store.append_turn("b", "qb", "rb").await.unwrap();

        let a = store.messages("a").await.unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].content, "qa");
        let b = store.messages("b").await.unwrap();
        assert_eq!(b[1].content, "rb");
    }

    #[tokio::test]
    async fn test_empty_content_is_stored() {
        let store = make_store();
        store.append_turn("s1", "", "I don't know.").await.unwrap();
        let messages = store.messages("s1").await.unwrap();
        assert_eq!(messages[0].content, "");
    }

    #[tokio::test]
    async fn test_append_turn_rolls_back_on_failure() {
        let store = make_store();
        // Reject assistant rows so the second insert of the pair fails.
        store
            .db
            .with_conn(|conn| {
                conn.execute_batch(
                    "CREATE TRIGGER reject_assistant
                     BEFORE INSERT ON conversation_history
                     WHEN NEW.role = 'assistant'
                     BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
                )
                .map_err(|e| LexqError::Storage(e.to_string()))
            })
            .unwrap();

        let result = store.append_turn("s1", "question", "answer").await;
        assert!(matches!(result, Err(LexqError::Storage(_))));
        assert!(store.messages("s1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_sessions_and_clear() {
        let store = make_store();
        store.append_turn("a", "q", "r").await.unwrap();
        store.append_turn("b", "q", "r").await.unwrap();
        store.append_turn("b", "q2", "r2").await.unwrap();

        let sessions = store.list_sessions(10).unwrap();
        assert_eq!(sessions.len(), 2);
        let b = sessions.iter().find(|s| s.session_id == "b").unwrap();
        assert_eq!(b.message_count, 4);

        assert_eq!(store.clear("b").unwrap(), 4);
        assert!(store.messages("b").await.unwrap().is_empty());
        assert_eq!(store.messages("a").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_history_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        {
            let db = Arc::new(Database::new(&path).unwrap());
            let store = SqliteHistoryStore::new(db, "turns").unwrap();
            store.append_turn("s1", "q", "r").await.unwrap();
        }
        let db = Arc::new(Database::new(&path).unwrap());
        let store = SqliteHistoryStore::new(db, "turns").unwrap();
        assert_eq!(store.messages("s1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_keyword_table_name_round_trips() {
        let db = Arc::new(Database::in_memory().unwrap());
        let store = SqliteHistoryStore::new(db, "order").unwrap();
        store.append_turn("s1", "q", "r").await.unwrap();
        assert_eq!(store.messages("s1").await.unwrap().len(), 2);
        assert_eq!(store.list_sessions(10).unwrap().len(), 1);
        assert_eq!(store.clear("s1").unwrap(), 2);
    }

    #[test]
    fn test_reserved_table_name_rejected_in_any_case() {
        let db = Arc::new(Database::in_memory().unwrap());
        let result = SqliteHistoryStore::new(db, "SCHEMA_MIGRATIONS");
        assert!(matches!(result, Err(LexqError::Config(_))));
    }

    #[test]
    fn test_invalid_table_name_rejected() {
        let db = Arc::new(Database::in_memory().unwrap());
        let result = SqliteHistoryStore::new(db, "bad name");
        assert!(matches!(result, Err(LexqError::Config(_))));
    }
}
