//! Database schema
//!
//! All tables live in one SQLite file. The schema is applied idempotently on
//! every open and its version is recorded in `schema_meta`.

use crate::error::{MemoryError, Result};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

/// Current schema version
pub const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS schema_meta (
    name  TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS memory_entries (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    key           TEXT    NOT NULL,
    namespace     TEXT    NOT NULL DEFAULT 'default',
    value         TEXT    NOT NULL,
    value_kind    TEXT    NOT NULL DEFAULT 'text',
    metadata      TEXT,
    created_at    TEXT    NOT NULL,
    updated_at    TEXT    NOT NULL,
    accessed_at   TEXT    NOT NULL,
    access_count  INTEGER NOT NULL DEFAULT 0,
    embedding_ref TEXT,
    UNIQUE (key, namespace)
);

CREATE INDEX IF NOT EXISTS idx_memory_namespace ON memory_entries(namespace);
CREATE INDEX IF NOT EXISTS idx_memory_updated ON memory_entries(updated_at);
CREATE INDEX IF NOT EXISTS idx_memory_access ON memory_entries(access_count DESC);
CREATE INDEX IF NOT EXISTS idx_memory_embedding ON memory_entries(embedding_ref);

CREATE TABLE IF NOT EXISTS sessions (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id    TEXT NOT NULL,
    request_text  TEXT NOT NULL,
    response_text TEXT NOT NULL,
    timestamp     TEXT NOT NULL,
    tags          TEXT
);

CREATE INDEX IF NOT EXISTS idx_sessions_session ON sessions(session_id, id);
CREATE INDEX IF NOT EXISTS idx_sessions_timestamp ON sessions(timestamp);

CREATE TABLE IF NOT EXISTS search_vectors (
    content_hash      TEXT PRIMARY KEY,
    vector            BLOB    NOT NULL,
    dimension         INTEGER NOT NULL,
    model_fingerprint TEXT    NOT NULL,
    created_at        TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS response_cache (
    prompt_hash TEXT PRIMARY KEY,
    model       TEXT    NOT NULL,
    response    TEXT    NOT NULL,
    tokens_used INTEGER,
    created_at  TEXT    NOT NULL,
    hit_count   INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_response_cache_created ON response_cache(created_at);
"#;

/// Create missing tables and record the schema version
///
/// Refuses to touch a database written by a newer version of this crate.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let existing: Option<String> = conn
        .query_row(
            "SELECT value FROM schema_meta WHERE name = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    match existing.as_deref().map(str::parse::<i64>) {
        None => {
            conn.execute(
                "INSERT INTO schema_meta (name, value) VALUES ('schema_version', ?1)",
                params![SCHEMA_VERSION.to_string()],
            )?;
            info!("Initialized memory schema v{}", SCHEMA_VERSION);
        }
        Some(Ok(version)) if version > SCHEMA_VERSION => {
            return Err(MemoryError::Storage(format!(
                "database schema v{} is newer than supported v{}",
                version, SCHEMA_VERSION
            )));
        }
        Some(Ok(version)) => debug!("Memory schema v{} already present", version),
        Some(Err(_)) => {
            return Err(MemoryError::Storage(
                "schema_meta holds an unreadable schema_version".into(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        apply_schema(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('memory_entries', 'sessions', 'search_vectors', 'response_cache')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 4);
    }

    #[test]
    fn test_newer_schema_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn.execute(
            "UPDATE schema_meta SET value = '99' WHERE name = 'schema_version'",
            [],
        )
        .unwrap();

        assert!(matches!(apply_schema(&conn), Err(MemoryError::Storage(_))));
    }

    #[test]
    fn test_key_namespace_unique() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let insert = "INSERT INTO memory_entries
            (key, namespace, value, created_at, updated_at, accessed_at)
            VALUES ('k', 'ns', 'v', 't', 't', 't')";
        conn.execute(insert, []).unwrap();
        assert!(conn.execute(insert, []).is_err());
    }
}
