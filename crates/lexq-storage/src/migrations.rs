//! Database schema migrations.
//!
//! The history table name is deployment configuration, so migrations are
//! tracked per table in `schema_migrations`.

use rusqlite::Connection;
use tracing::info;

use lexq_core::error::LexqError;

/// Check that a configured table name is a plain SQL identifier.
///
/// Table names cannot be bound as parameters, so anything beyond
/// `[A-Za-z_][A-Za-z0-9_]*` is rejected before it reaches a statement.
/// SQLite compares identifiers case-insensitively, so the bookkeeping table
/// and the `sqlite_` prefix are rejected in any case. Keywords such as
/// `order` are accepted; statements always use [`quote_ident`].
pub fn validate_table_name(name: &str) -> Result<(), LexqError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    let reserved = name.eq_ignore_ascii_case("schema_migrations")
        || name
            .get(..7)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("sqlite_"));

    if valid && !reserved {
        Ok(())
    } else {
        Err(LexqError::Config(format!(
            "invalid history table name: '{}'",
            name
        )))
    }
}

/// Quote a validated identifier for use in SQL text.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name)
}

/// Run all pending migrations for the given history table.
pub fn run_migrations(conn: &Connection, table: &str) -> Result<(), LexqError> {
    validate_table_name(table)?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            name        TEXT PRIMARY KEY NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| LexqError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let v1 = format!("{}:v1", table);
    let applied: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE name = ?1",
            rusqlite::params![v1],
            |row| row.get(0),
        )
        .map_err(|e| LexqError::Storage(format!("Failed to query migrations: {}", e)))?;

    if applied == 0 {
        apply_v1(conn, table)?;
        conn.execute(
            "INSERT INTO schema_migrations (name) VALUES (?1)",
            rusqlite::params![v1],
        )
        .map_err(|e| LexqError::Storage(format!("Failed to record migration: {}", e)))?;
        info!(table = %table, "Applied migration v1: history table");
    }

    Ok(())
}

/// Version 1: history table keyed by (session_id, seq).
fn apply_v1(conn: &Connection, table: &str) -> Result<(), LexqError> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            session_id  TEXT NOT NULL,
            seq         INTEGER NOT NULL,
            role        TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
            content     TEXT NOT NULL,
            created_at  INTEGER NOT NULL,
            PRIMARY KEY (session_id, seq)
        );

        CREATE INDEX IF NOT EXISTS {index}
            ON {table} (created_at DESC);",
        table = quote_ident(table),
        index = quote_ident(&format!("idx_{}_created_at", table)),
    ))
    .map_err(|e| LexqError::Storage(format!("Failed to create history table: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_table_name() {
        assert!(validate_table_name("conversation_history").is_ok());
        assert!(validate_table_name("_t1").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("1table").is_err());
        assert!(validate_table_name("history; DROP TABLE x").is_err());
        assert!(validate_table_name("my-table").is_err());
        assert!(validate_table_name("schema_migrations").is_err());
        assert!(validate_table_name("SCHEMA_MIGRATIONS").is_err());
        assert!(validate_table_name("Schema_Migrations").is_err());
        assert!(validate_table_name("sqlite_master").is_err());
        assert!(validate_table_name("SQLITE_turns").is_err());
        assert!(validate_table_name("sqlite").is_ok());
    }

    #[test]
    fn test_migrations_accept_keyword_table_name() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn, "order").unwrap();
        run_migrations(&conn, "order").unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM \"order\"", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_migrations_create_table() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn, "turns").unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM turns", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn, "turns").unwrap();
        run_migrations(&conn, "turns").unwrap();
        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied, 1);
    }

    #[test]
    fn test_migrations_tracked_per_table() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn, "a").unwrap();
        run_migrations(&conn, "b").unwrap();
        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied, 2);
    }
}
