//! Memory manager facade
//!
//! [`MemoryManager`] is the only type callers (CLI commands, agent loops)
//! talk to. It is built once by the process entry point with
//! [`MemoryManager::open`], passed around by reference, and released with
//! [`MemoryManager::close`]. There is no global instance.
//!
//! # Example
//! ```no_run
//! use deepcli_memory::{MemoryConfig, MemoryManager, DEFAULT_NAMESPACE};
//!
//! # async fn run() -> deepcli_memory::Result<()> {
//! let manager = MemoryManager::open(MemoryConfig::with_db_path("/tmp/memory.db")).await?;
//! manager.store("greeting", "hello world", DEFAULT_NAMESPACE, None).await?;
//! let hits = manager.search("hello", None, 10).await?;
//! assert_eq!(hits[0].key, "greeting");
//! manager.close();
//! # Ok(())
//! # }
//! ```

use crate::config::MemoryConfig;
use crate::error::{MemoryError, Result};
use crate::namespace::{names_in_order, validate_key, validate_namespace};
use crate::retention::{RetentionPolicy, SweepReport};
use crate::search::normalize::content_hash;
use crate::search::tfidf::{cosine_similarity, TfidfVectorizer};
use crate::search::{rank_hits, validate_limit, SearchStrategyKind};
use crate::storage::{cache::prompt_hash, EncodedRecord, SqliteStorage, StorageBackend};
use crate::transfer::{plan_import, ExportDocument};
use crate::types::{
    CachedResponse, MemoryRecord, MemoryStats, MemoryValue, Metadata, NamespaceCount, SearchHit,
    SessionEntry,
};
use crate::utils::string::sanitize_file_stem;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Entries in each top-N list of [`MemoryStats`]
pub const DEFAULT_STATS_TOP_N: usize = 5;

/// Persistent keyed memory with namespaces and naive search
pub struct MemoryManager {
    storage: Arc<dyn StorageBackend>,
    config: MemoryConfig,
    vectorizer: Option<Arc<TfidfVectorizer>>,
}

impl MemoryManager {
    /// Open the configured database and prepare the search strategy
    pub async fn open(config: MemoryConfig) -> Result<Self> {
        config.validate()?;
        let storage = SqliteStorage::open(&config.storage).await?;
        Self::with_storage(config, Arc::new(storage))
    }

    /// Build a manager over an already-open backend
    ///
    /// The TF-IDF vocabulary is fit here, once, when that strategy is
    /// configured; it never changes for the lifetime of the manager.
    pub fn with_storage(config: MemoryConfig, storage: Arc<dyn StorageBackend>) -> Result<Self> {
        let vectorizer = match config.search.strategy {
            SearchStrategyKind::Substring => None,
            SearchStrategyKind::Tfidf => {
                let search = &config.search;
                let vectorizer = match &search.seed_corpus_path {
                    Some(path) => {
                        TfidfVectorizer::from_seed_file(path, search.dimension, search.max_text_len)?
                    }
                    None => TfidfVectorizer::with_default_corpus(search.dimension, search.max_text_len)?,
                };
                Some(Arc::new(vectorizer))
            }
        };

        info!(
            "Memory manager ready (search strategy: {})",
            config.search.strategy
        );

        Ok(Self {
            storage,
            config,
            vectorizer,
        })
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn strategy(&self) -> SearchStrategyKind {
        self.config.search.strategy
    }

    /// Release the connection pool
    pub fn close(self) {
        self.storage.close();
    }

    /// Insert or replace `(key, namespace)`
    ///
    /// Replacing keeps `created_at` and `access_count`; `updated_at` moves
    /// only if the value or metadata differ from what is stored.
    pub async fn store(
        &self,
        key: &str,
        value: impl Into<MemoryValue>,
        namespace: &str,
        metadata: Option<Metadata>,
    ) -> Result<()> {
        validate_key(key)?;
        validate_namespace(namespace)?;

        let record = EncodedRecord::encode(key, namespace, &value.into(), metadata.as_ref())?;
        debug!("Storing {}/{} ({})", namespace, key, record.value_kind);
        self.storage.upsert_record(record).await
    }

    /// Fetch a value, counting the access; `None` when absent
    pub async fn recall(&self, key: &str, namespace: &str) -> Result<Option<MemoryValue>> {
        Ok(self.recall_record(key, namespace).await?.map(|r| r.value))
    }

    /// Like [`MemoryManager::recall`] but returns the whole record
    pub async fn recall_record(&self, key: &str, namespace: &str) -> Result<Option<MemoryRecord>> {
        validate_key(key)?;
        let record = self.storage.recall_record(key, namespace).await?;
        debug!(
            "Recall {}/{}: {}",
            namespace,
            key,
            if record.is_some() { "hit" } else { "miss" }
        );
        Ok(record)
    }

    /// Recall for interactive callers: any failure degrades to "no memory"
    pub async fn recall_or_none(&self, key: &str, namespace: &str) -> Option<MemoryValue> {
        match self.recall(key, namespace).await {
            Ok(value) => value,
            Err(e) if e.is_storage() => {
                warn!("Memory unavailable for {}/{}: {}", namespace, key, e);
                None
            }
            Err(e) => {
                warn!("Recall of {}/{} failed: {}", namespace, key, e);
                None
            }
        }
    }

    /// Read a record without touching its access bookkeeping
    pub async fn peek(&self, key: &str, namespace: &str) -> Result<Option<MemoryRecord>> {
        validate_key(key)?;
        self.storage.peek_record(key, namespace).await
    }

    /// Ranked search with the configured strategy
    ///
    /// An empty query lists records in ranking order. A whitespace-only query
    /// is an ordinary pattern and matches only text containing it. An unknown
    /// namespace yields no hits.
    pub async fn search(
        &self,
        query: &str,
        namespace: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        validate_limit(limit)?;

        if query.is_empty() {
            let records = self.storage.list_records(namespace, Some(limit)).await?;
            return Ok(records
                .into_iter()
                .map(|record| SearchHit::from_record(record, 1.0))
                .collect());
        }

        match self.config.search.strategy {
            SearchStrategyKind::Substring => {
                let records = self.storage.substring_search(query, namespace, limit).await?;
                Ok(records
                    .into_iter()
                    .map(|record| SearchHit::from_record(record, 1.0))
                    .collect())
            }
            SearchStrategyKind::Tfidf => self.tfidf_search(query, namespace, limit).await,
        }
    }

    async fn tfidf_search(
        &self,
        query: &str,
        namespace: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let vectorizer = self.vectorizer.clone().ok_or_else(|| {
            MemoryError::Config("TF-IDF search requested but no vectorizer was fit".into())
        })?;

        let query_vector = vectorizer.transform(query);
        if query_vector.iter().all(|x| *x == 0.0) {
            debug!("Query shares no vocabulary with the seed corpus");
            return Ok(Vec::new());
        }

        let candidates = self
            .storage
            .vector_candidates(namespace, self.config.search.max_candidates, vectorizer)
            .await?;

        let threshold = self.config.search.similarity_threshold;
        let hits: Vec<SearchHit> = candidates
            .into_iter()
            .filter_map(|(record, vector)| {
                let score = cosine_similarity(&query_vector, &vector);
                (score > 0.0 && score >= threshold).then(|| SearchHit::from_record(record, score))
            })
            .collect();

        debug!("TF-IDF search matched {} records", hits.len());
        Ok(rank_hits(hits, limit))
    }

    /// Delete `(key, namespace)`; false when nothing was there
    pub async fn forget(&self, key: &str, namespace: &str) -> Result<bool> {
        validate_key(key)?;
        let deleted = self.storage.delete_record(key, namespace).await?;
        debug!("Forget {}/{}: {}", namespace, key, deleted);
        Ok(deleted)
    }

    /// Delete every record in a namespace and return how many went
    pub async fn clear_namespace(&self, namespace: &str) -> Result<u64> {
        validate_namespace(namespace)?;
        let deleted = self.storage.delete_namespace(namespace).await?;
        info!("Cleared namespace '{}' ({} records)", namespace, deleted);
        Ok(deleted)
    }

    /// Distinct namespaces, ascending
    pub async fn list_namespaces(&self) -> Result<Vec<String>> {
        Ok(names_in_order(&self.storage.namespace_counts().await?))
    }

    /// Per-namespace counts, descending by count then ascending by name
    pub async fn namespace_counts(&self) -> Result<Vec<NamespaceCount>> {
        self.storage.namespace_counts().await
    }

    pub async fn get_stats(&self) -> Result<MemoryStats> {
        self.get_stats_top(DEFAULT_STATS_TOP_N).await
    }

    pub async fn get_stats_top(&self, top_n: usize) -> Result<MemoryStats> {
        self.storage.stats(top_n).await
    }

    /// Write every record of `namespace` to a JSON document at `destination`
    pub async fn export_namespace(&self, namespace: &str, destination: &Path) -> Result<usize> {
        validate_namespace(namespace)?;

        let records = self.storage.list_records(Some(namespace), None).await?;
        let document = ExportDocument::from_records(namespace, &records, Utc::now());

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(destination, document.to_json_pretty()?).await?;

        info!(
            "Exported {} records from '{}' to {}",
            document.count,
            namespace,
            destination.display()
        );
        Ok(document.count)
    }

    /// Upsert the records of an export document; returns how many landed
    ///
    /// Records go into `target_namespace`, or the document's own namespace
    /// when that is `None`. Re-importing the same document is idempotent.
    pub async fn import_namespace(&self, source: &Path, target_namespace: Option<&str>) -> Result<usize> {
        if let Some(ns) = target_namespace {
            validate_namespace(ns)?;
        }

        let raw = tokio::fs::read_to_string(source).await?;
        let plan = plan_import(&raw, target_namespace)?;
        let namespace = plan.namespace.clone();
        let skipped = plan.skipped;

        let imported = self.storage.import_records(plan.records).await?;
        info!(
            "Imported {} records into '{}' from {} ({} skipped)",
            imported,
            namespace,
            source.display(),
            skipped
        );
        Ok(imported)
    }

    /// Append one exchange to a session log
    ///
    /// With `sessions.mirror_dir` configured the entry is also appended as a
    /// JSON line to the file named by [`session_mirror_file_name`].
    pub async fn append_session(
        &self,
        session_id: &str,
        request_text: &str,
        response_text: &str,
        tags: Vec<String>,
    ) -> Result<SessionEntry> {
        if session_id.trim().is_empty() {
            return Err(MemoryError::Validation("session_id must not be empty".into()));
        }

        let entry = self
            .storage
            .append_session(session_id, request_text, response_text, tags)
            .await?;

        if let Some(dir) = &self.config.sessions.mirror_dir {
            if let Err(e) = mirror_session_entry(dir, &entry).await {
                warn!("Failed to mirror session '{}': {}", session_id, e);
                return Err(e);
            }
        }

        Ok(entry)
    }

    /// The newest `limit` entries of a session, oldest first
    pub async fn session_history(&self, session_id: &str, limit: usize) -> Result<Vec<SessionEntry>> {
        validate_limit(limit)?;
        self.storage.session_history(session_id, limit).await
    }

    /// Remember a model response for `(prompt, model)`
    pub async fn cache_response(
        &self,
        prompt: &str,
        model: &str,
        response: &str,
        tokens_used: Option<i64>,
    ) -> Result<()> {
        let hash = prompt_hash(model, prompt);
        debug!("Caching response for prompt {}", &hash[..12]);
        self.storage
            .put_cached_response(&hash, model, response, tokens_used)
            .await
    }

    /// A previously cached response, counting the hit
    pub async fn cached_response(&self, prompt: &str, model: &str) -> Result<Option<CachedResponse>> {
        self.storage
            .get_cached_response(&prompt_hash(model, prompt))
            .await
    }

    /// Retention sweep using the configured thresholds
    pub async fn sweep(&self) -> Result<SweepReport> {
        self.sweep_with(RetentionPolicy::from(&self.config.retention))
            .await
    }

    pub async fn sweep_with(&self, policy: RetentionPolicy) -> Result<SweepReport> {
        let report = self.storage.purge(policy.cutoffs(Utc::now())).await?;
        info!("Retention sweep removed {}", report);
        Ok(report)
    }
}

/// Mirror file for a session: readable stem plus a hash of the raw id
///
/// Ids that sanitize to the same stem (`chat/1`, `chat_1`) still get
/// separate files.
pub fn session_mirror_file_name(session_id: &str) -> String {
    format!(
        "{}-{}.jsonl",
        sanitize_file_stem(session_id),
        &content_hash(session_id)[..12]
    )
}

async fn mirror_session_entry(dir: &Path, entry: &SessionEntry) -> Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(session_mirror_file_name(&entry.session_id));

    let mut line = serde_json::to_string(entry)?;
    line.push('\n');

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}
