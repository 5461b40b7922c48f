//! Common test utilities and helpers

#![allow(dead_code)]

use deepcli_memory::{MemoryConfig, MemoryManager};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Database file used by every helper below
pub fn db_path(dir: &TempDir) -> PathBuf {
    dir.path().join("memory.db")
}

/// Default configuration rooted in `dir`
pub fn test_config(dir: &TempDir) -> MemoryConfig {
    MemoryConfig::with_db_path(db_path(dir))
}

/// Open a manager over a fresh database in `dir`
pub async fn open_manager(dir: &TempDir) -> MemoryManager {
    open_manager_with(dir, |_| {}).await
}

/// Open a manager after adjusting the default test configuration
pub async fn open_manager_with(dir: &TempDir, tweak: impl FnOnce(&mut MemoryConfig)) -> MemoryManager {
    let mut config = test_config(dir);
    tweak(&mut config);
    MemoryManager::open(config)
        .await
        .expect("Failed to open test manager")
}

/// Side connection to the same database for inspecting or backdating rows
pub fn raw_connection(path: &Path) -> Connection {
    let conn = Connection::open(path).expect("Failed to open raw connection");
    conn.busy_timeout(Duration::from_secs(5))
        .expect("Failed to set busy timeout");
    conn
}

/// Overwrite `updated_at` (and `created_at`) of one record
pub fn set_record_timestamp(path: &Path, key: &str, namespace: &str, timestamp: &str) {
    let conn = raw_connection(path);
    let changed = conn
        .execute(
            "UPDATE memory_entries SET updated_at = ?1, created_at = ?1
             WHERE key = ?2 AND namespace = ?3",
            params![timestamp, key, namespace],
        )
        .expect("Failed to backdate record");
    assert_eq!(changed, 1, "no record {}/{}", namespace, key);
}

/// Overwrite the timestamp of every entry in a session
pub fn set_session_timestamp(path: &Path, session_id: &str, timestamp: &str) {
    let conn = raw_connection(path);
    conn.execute(
        "UPDATE sessions SET timestamp = ?1 WHERE session_id = ?2",
        params![timestamp, session_id],
    )
    .expect("Failed to backdate session");
}

/// Overwrite `created_at` of every cached response
pub fn set_cache_timestamp(path: &Path, timestamp: &str) {
    let conn = raw_connection(path);
    conn.execute("UPDATE response_cache SET created_at = ?1", params![timestamp])
        .expect("Failed to backdate response cache");
}

/// Row count of a table
pub fn count_rows(path: &Path, table: &str) -> i64 {
    let conn = raw_connection(path);
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
        .expect("Failed to count rows")
}

/// The `embedding_ref` column of one record
pub fn embedding_ref(path: &Path, key: &str, namespace: &str) -> Option<String> {
    let conn = raw_connection(path);
    conn.query_row(
        "SELECT embedding_ref FROM memory_entries WHERE key = ?1 AND namespace = ?2",
        params![key, namespace],
        |row| row.get(0),
    )
    .expect("Failed to read embedding_ref")
}

/// Sleep long enough for the next write to get a later microsecond timestamp
pub async fn tick() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}
