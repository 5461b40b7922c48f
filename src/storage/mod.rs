//! Storage layer for the DeepCLI memory store
//!
//! [`StorageBackend`] is the async seam the [`MemoryManager`] talks to. The
//! only implementation, [`SqliteStorage`], runs every call as one pooled
//! connection checkout plus one transaction, so each trait method is a single
//! await point with no torn writes in between.
//!
//! The statement modules (`records`, `vectors`, `sessions`, `cache`) are plain
//! synchronous functions over a borrowed [`rusqlite::Connection`].
//!
//! [`MemoryManager`]: crate::manager::MemoryManager

pub mod cache;
pub mod records;
pub mod schema;
pub mod sessions;
pub mod sqlite;
pub mod vectors;

pub use records::EncodedRecord;
pub use sqlite::SqliteStorage;

use crate::error::Result;
use crate::retention::{PurgeCutoffs, SweepReport};
use crate::search::tfidf::TfidfVectorizer;
use crate::types::{CachedResponse, MemoryRecord, MemoryStats, NamespaceCount, SessionEntry};
use async_trait::async_trait;
use std::sync::Arc;

/// Storage backend trait defining all required operations
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Insert or replace a record (see [`records::upsert`] for the policy)
    async fn upsert_record(&self, record: EncodedRecord) -> Result<()>;

    /// Fetch a record and bump its access bookkeeping
    async fn recall_record(&self, key: &str, namespace: &str) -> Result<Option<MemoryRecord>>;

    /// Fetch a record without touching it
    async fn peek_record(&self, key: &str, namespace: &str) -> Result<Option<MemoryRecord>>;

    async fn delete_record(&self, key: &str, namespace: &str) -> Result<bool>;

    async fn delete_namespace(&self, namespace: &str) -> Result<u64>;

    /// Per-namespace counts, descending by count then ascending by name
    async fn namespace_counts(&self) -> Result<Vec<NamespaceCount>>;

    /// Records in search order; `limit = None` returns all of them
    async fn list_records(
        &self,
        namespace: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<MemoryRecord>>;

    /// Case-insensitive substring match on key or value, in search order
    async fn substring_search(
        &self,
        query: &str,
        namespace: Option<&str>,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>>;

    /// Up to `max_candidates` records in search order, each paired with its
    /// search vector. Missing vectors are computed and cached on the way.
    async fn vector_candidates(
        &self,
        namespace: Option<&str>,
        max_candidates: usize,
        vectorizer: Arc<TfidfVectorizer>,
    ) -> Result<Vec<(MemoryRecord, Vec<f32>)>>;

    /// Upsert each record in its own savepoint; returns how many landed
    async fn import_records(&self, records: Vec<EncodedRecord>) -> Result<usize>;

    async fn stats(&self, top_n: usize) -> Result<MemoryStats>;

    async fn append_session(
        &self,
        session_id: &str,
        request_text: &str,
        response_text: &str,
        tags: Vec<String>,
    ) -> Result<SessionEntry>;

    async fn session_history(&self, session_id: &str, limit: usize) -> Result<Vec<SessionEntry>>;

    async fn put_cached_response(
        &self,
        prompt_hash: &str,
        model: &str,
        response: &str,
        tokens_used: Option<i64>,
    ) -> Result<()>;

    /// Look up a cached response, counting the hit
    async fn get_cached_response(&self, prompt_hash: &str) -> Result<Option<CachedResponse>>;

    /// Delete everything older than the given cutoffs and prune orphaned vectors
    async fn purge(&self, cutoffs: PurgeCutoffs) -> Result<SweepReport>;

    /// Release pooled connections; later calls fail with a storage error
    fn close(&self);
}
