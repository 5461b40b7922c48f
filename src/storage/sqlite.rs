//! SQLite storage backend
//!
//! A `deadpool-sqlite` pool of `rusqlite` connections (bundled SQLite, WAL
//! journal). Each [`StorageBackend`] call checks out one connection and runs
//! one transaction inside `interact`. No locking happens above SQLite itself:
//! two writers racing on the same `(key, namespace)` resolve last-write-wins.

use super::{cache, records, schema, sessions, vectors, EncodedRecord, StorageBackend};
use crate::config::StorageConfig;
use crate::error::{MemoryError, Result};
use crate::retention::{PurgeCutoffs, SweepReport};
use crate::search::normalize::content_hash;
use crate::search::tfidf::TfidfVectorizer;
use crate::types::{CachedResponse, MemoryRecord, MemoryStats, NamespaceCount, SessionEntry, ValueKind};
use async_trait::async_trait;
use deadpool_sqlite::{Config, Pool, PoolConfig, Runtime};
use rusqlite::Connection;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long a connection waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

/// SQLite-backed [`StorageBackend`]
pub struct SqliteStorage {
    pool: Pool,
    path: PathBuf,
}

/// Check that an existing file is really a SQLite database
///
/// Returns whether the file exists. An empty file counts as a fresh database,
/// the same way SQLite itself treats it.
pub fn validate_database_file(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }

    let mut file = std::fs::File::open(path)?;
    let mut header = Vec::with_capacity(SQLITE_HEADER.len());
    file.by_ref()
        .take(SQLITE_HEADER.len() as u64)
        .read_to_end(&mut header)?;

    if header.is_empty() {
        return Ok(true);
    }

    if header.as_slice() != SQLITE_HEADER.as_slice() {
        return Err(MemoryError::Storage(format!(
            "Database file at '{}' is corrupted or not a valid SQLite database",
            path.display()
        )));
    }

    debug!("Database file validation passed: {}", path.display());
    Ok(true)
}

impl SqliteStorage {
    /// Open (or create) the database, enable WAL and apply the schema
    pub async fn open(config: &StorageConfig) -> Result<Self> {
        let path = config.db_path.clone();
        let exists = validate_database_file(&path)?;

        if !exists {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        info!(
            "Opening memory database at: {} (pool_size: {})",
            path.display(),
            config.pool_size
        );

        let mut pool_config = Config::new(path.clone());
        pool_config.pool = Some(PoolConfig::new(config.pool_size));
        let pool = pool_config.create_pool(Runtime::Tokio1).map_err(|e| {
            MemoryError::Storage(format!("Failed to create connection pool: {}", e))
        })?;

        let storage = Self { pool, path };
        storage
            .interact("open", |conn| {
                let mode: String =
                    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
                debug!("journal_mode = {}", mode);
                schema::apply_schema(conn)
            })
            .await?;

        Ok(storage)
    }

    /// Run `f` on a pooled connection
    async fn interact<F, T>(&self, op: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.pool.get().await.map_err(|e| {
            MemoryError::Storage(format!("Failed to get connection from pool: {}", e))
        })?;

        conn.interact(move |conn| -> Result<T> {
            conn.busy_timeout(BUSY_TIMEOUT)?;
            f(conn)
        })
        .await
        .map_err(|e| MemoryError::Storage(format!("{}: pool interaction failed: {}", op, e)))?
    }
}

#[async_trait]
impl StorageBackend for SqliteStorage {
    async fn upsert_record(&self, record: EncodedRecord) -> Result<()> {
        self.interact("upsert", move |conn| {
            let tx = conn.transaction()?;
            records::upsert(&tx, &record, &records::now_timestamp())?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn recall_record(&self, key: &str, namespace: &str) -> Result<Option<MemoryRecord>> {
        let (key, namespace) = (key.to_string(), namespace.to_string());
        self.interact("recall", move |conn| {
            let tx = conn.transaction()?;
            let record = records::fetch_and_touch(&tx, &key, &namespace, &records::now_timestamp())?;
            tx.commit()?;
            Ok(record)
        })
        .await
    }

    async fn peek_record(&self, key: &str, namespace: &str) -> Result<Option<MemoryRecord>> {
        let (key, namespace) = (key.to_string(), namespace.to_string());
        self.interact("peek", move |conn| records::peek(conn, &key, &namespace))
            .await
    }

    async fn delete_record(&self, key: &str, namespace: &str) -> Result<bool> {
        let (key, namespace) = (key.to_string(), namespace.to_string());
        self.interact("forget", move |conn| records::delete(conn, &key, &namespace))
            .await
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<u64> {
        let namespace = namespace.to_string();
        self.interact("clear_namespace", move |conn| {
            records::delete_namespace(conn, &namespace)
        })
        .await
    }

    async fn namespace_counts(&self) -> Result<Vec<NamespaceCount>> {
        self.interact("namespace_counts", |conn| records::namespace_counts(conn))
            .await
    }

    async fn list_records(
        &self,
        namespace: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<MemoryRecord>> {
        let namespace = namespace.map(str::to_string);
        self.interact("list", move |conn| {
            records::list(conn, namespace.as_deref(), limit)
        })
        .await
    }

    async fn substring_search(
        &self,
        query: &str,
        namespace: Option<&str>,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>> {
        let query = query.to_string();
        let namespace = namespace.map(str::to_string);
        self.interact("substring_search", move |conn| {
            records::substring_search(conn, &query, namespace.as_deref(), limit)
        })
        .await
    }

    async fn vector_candidates(
        &self,
        namespace: Option<&str>,
        max_candidates: usize,
        vectorizer: Arc<TfidfVectorizer>,
    ) -> Result<Vec<(MemoryRecord, Vec<f32>)>> {
        let namespace = namespace.map(str::to_string);
        self.interact("vector_candidates", move |conn| {
            let tx = conn.transaction()?;
            let candidates = records::list(&tx, namespace.as_deref(), Some(max_candidates))?;
            let fingerprint = vectorizer.fingerprint().to_string();
            let now = records::now_timestamp();

            let prepared: Vec<(MemoryRecord, String, String)> = candidates
                .into_iter()
                .filter(|record| record.value.kind() != ValueKind::Binary)
                .filter_map(|record| {
                    let normalized = vectorizer.normalize(&record.value.searchable_text());
                    if normalized.is_empty() {
                        return None;
                    }
                    let hash = content_hash(&normalized);
                    Some((record, normalized, hash))
                })
                .collect();

            let hashes: Vec<String> = prepared.iter().map(|(_, _, hash)| hash.clone()).collect();
            let mut cached = vectors::load_many(&tx, &hashes, &fingerprint)?;

            let mut computed = 0usize;
            let mut scored = Vec::with_capacity(prepared.len());
            for (mut record, normalized, hash) in prepared {
                let vector = match cached.get(&hash) {
                    Some(vector) => vector.clone(),
                    None => {
                        let vector = vectorizer.transform_normalized(&normalized);
                        vectors::save(&tx, &hash, &vector, &fingerprint, &now)?;
                        cached.insert(hash.clone(), vector.clone());
                        computed += 1;
                        vector
                    }
                };

                if record.embedding_ref.as_deref() != Some(hash.as_str()) {
                    let stored = record.value.encode()?;
                    records::set_embedding_ref(&tx, record.id, &stored, &hash)?;
                    record.embedding_ref = Some(hash);
                }

                scored.push((record, vector));
            }

            tx.commit()?;
            debug!(
                "Prepared {} search candidates ({} vectors computed)",
                scored.len(),
                computed
            );
            Ok(scored)
        })
        .await
    }

    async fn import_records(&self, to_import: Vec<EncodedRecord>) -> Result<usize> {
        self.interact("import", move |conn| {
            let mut tx = conn.transaction()?;
            let now = records::now_timestamp();
            let mut imported = 0usize;

            for record in &to_import {
                let sp = tx.savepoint()?;
                match records::upsert(&sp, record, &now) {
                    Ok(()) => {
                        sp.commit()?;
                        imported += 1;
                    }
                    Err(e) => {
                        warn!("Skipping import of '{}': {}", record.key, e);
                    }
                }
            }

            tx.commit()?;
            Ok(imported)
        })
        .await
    }

    async fn stats(&self, top_n: usize) -> Result<MemoryStats> {
        self.interact("stats", move |conn| {
            let tx = conn.transaction()?;
            let stats = MemoryStats {
                total: records::count(&tx, None)?,
                per_namespace: records::namespace_counts(&tx)?,
                most_accessed: records::most_accessed(&tx, top_n)?,
                recent: records::recently_updated(&tx, top_n)?,
                sessions: sessions::count(&tx)?,
                search_vectors: vectors::count(&tx)?,
                cached_responses: cache::count(&tx)?,
            };
            tx.commit()?;
            Ok(stats)
        })
        .await
    }

    async fn append_session(
        &self,
        session_id: &str,
        request_text: &str,
        response_text: &str,
        tags: Vec<String>,
    ) -> Result<SessionEntry> {
        let (session_id, request_text, response_text) = (
            session_id.to_string(),
            request_text.to_string(),
            response_text.to_string(),
        );
        self.interact("append_session", move |conn| {
            sessions::append(
                conn,
                &session_id,
                &request_text,
                &response_text,
                &tags,
                &records::now_timestamp(),
            )
        })
        .await
    }

    async fn session_history(&self, session_id: &str, limit: usize) -> Result<Vec<SessionEntry>> {
        let session_id = session_id.to_string();
        self.interact("session_history", move |conn| {
            sessions::history(conn, &session_id, limit)
        })
        .await
    }

    async fn put_cached_response(
        &self,
        prompt_hash: &str,
        model: &str,
        response: &str,
        tokens_used: Option<i64>,
    ) -> Result<()> {
        let (prompt_hash, model, response) =
            (prompt_hash.to_string(), model.to_string(), response.to_string());
        self.interact("cache_response", move |conn| {
            cache::put(
                conn,
                &prompt_hash,
                &model,
                &response,
                tokens_used,
                &records::now_timestamp(),
            )
        })
        .await
    }

    async fn get_cached_response(&self, prompt_hash: &str) -> Result<Option<CachedResponse>> {
        let prompt_hash = prompt_hash.to_string();
        self.interact("cached_response", move |conn| {
            let tx = conn.transaction()?;
            let cached = cache::get_and_hit(&tx, &prompt_hash)?;
            tx.commit()?;
            Ok(cached)
        })
        .await
    }

    async fn purge(&self, cutoffs: PurgeCutoffs) -> Result<SweepReport> {
        self.interact("sweep", move |conn| {
            let tx = conn.transaction()?;
            let mut report = SweepReport::default();

            if let Some(cutoff) = &cutoffs.records {
                report.records = records::purge_older_than(&tx, cutoff)?;
            }
            if let Some(cutoff) = &cutoffs.sessions {
                report.sessions = sessions::purge_older_than(&tx, cutoff)?;
            }
            if let Some(cutoff) = &cutoffs.responses {
                report.cached_responses = cache::purge_older_than(&tx, cutoff)?;
            }
            report.orphaned_vectors = vectors::prune_orphans(&tx)?;

            tx.commit()?;
            Ok(report)
        })
        .await
    }

    fn close(&self) {
        info!("Closing memory database at: {}", self.path.display());
        self.pool.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MemoryValue;
    use tempfile::TempDir;

    async fn open_temp() -> (SqliteStorage, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = StorageConfig {
            db_path: dir.path().join("nested").join("memory.db"),
            pool_size: 2,
        };
        (SqliteStorage::open(&config).await.unwrap(), dir)
    }

    fn record(key: &str, ns: &str, value: &str) -> EncodedRecord {
        EncodedRecord::encode(key, ns, &MemoryValue::from(value), None).unwrap()
    }

    #[tokio::test]
    async fn test_open_creates_parent_directories() {
        let (storage, dir) = open_temp().await;
        assert!(dir.path().join("nested").join("memory.db").exists());
        assert!(validate_database_file(&storage.path).unwrap());
    }

    #[tokio::test]
    async fn test_recall_touches_and_peek_does_not() {
        let (storage, _dir) = open_temp().await;
        storage.upsert_record(record("k", "default", "v")).await.unwrap();

        storage.recall_record("k", "default").await.unwrap();
        let recalled = storage.recall_record("k", "default").await.unwrap().unwrap();
        assert_eq!(recalled.access_count, 2);

        let peeked = storage.peek_record("k", "default").await.unwrap().unwrap();
        assert_eq!(peeked.access_count, 2);
    }

    #[tokio::test]
    async fn test_import_counts_landed_records() {
        let (storage, _dir) = open_temp().await;
        let batch = vec![record("a", "ns", "1"), record("b", "ns", "2"), record("a", "ns", "3")];

        assert_eq!(storage.import_records(batch).await.unwrap(), 3);
        assert_eq!(storage.namespace_counts().await.unwrap()[0].count, 2);
        let a = storage.peek_record("a", "ns").await.unwrap().unwrap();
        assert_eq!(a.value, MemoryValue::from("3"));
    }

    #[tokio::test]
    async fn test_vector_candidates_cache_shared_content() {
        let (storage, _dir) = open_temp().await;
        storage.upsert_record(record("a", "default", "Fix the database bug")).await.unwrap();
        storage.upsert_record(record("b", "default", "fix the DATABASE bug!")).await.unwrap();
        storage
            .upsert_record(EncodedRecord::encode("c", "default", &MemoryValue::from(vec![1u8, 2]), None).unwrap())
            .await
            .unwrap();

        let vectorizer = Arc::new(TfidfVectorizer::with_default_corpus(64, 1000).unwrap());
        let candidates = storage
            .vector_candidates(None, 100, vectorizer.clone())
            .await
            .unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].0.embedding_ref, candidates[1].0.embedding_ref);
        assert_eq!(storage.stats(5).await.unwrap().search_vectors, 1);

        let a = storage.peek_record("a", "default").await.unwrap().unwrap();
        assert!(a.embedding_ref.is_some());
    }

    #[tokio::test]
    async fn test_closed_storage_fails_with_storage_error() {
        let (storage, _dir) = open_temp().await;
        storage.close();

        let err = storage.peek_record("k", "default").await.unwrap_err();
        assert!(err.is_storage());
    }

    #[test]
    fn test_validate_rejects_garbage_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memory.db");
        std::fs::write(&path, b"this is definitely not sqlite").unwrap();

        assert!(matches!(validate_database_file(&path), Err(MemoryError::Storage(_))));
    }

    #[test]
    fn test_validate_accepts_missing_and_empty_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memory.db");
        assert!(!validate_database_file(&path).unwrap());

        std::fs::write(&path, b"").unwrap();
        assert!(validate_database_file(&path).unwrap());
    }
}
