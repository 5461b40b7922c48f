//! DeepCLI Memory - persistent keyed memory for the DeepCLI agent tools
//!
//! A small SQLite-backed store that agents and CLI commands use to remember
//! named values across sessions:
//! - `(key, namespace)` upserts with access bookkeeping
//! - A namespace directory with deterministic ordering
//! - Naive search: substring, or closed-vocabulary TF-IDF
//! - Session logs, a model response cache, export/import and retention
//!
//! # Architecture
//!
//! - **Types**: records, values and summaries ([`types`])
//! - **Storage**: pooled SQLite behind the [`StorageBackend`] trait ([`storage`])
//! - **Search**: ranking contract and vectorizer ([`search`])
//! - **Manager**: the [`MemoryManager`] facade every caller goes through
//!
//! # Example
//!
//! ```no_run
//! use deepcli_memory::{MemoryConfig, MemoryManager, DEFAULT_NAMESPACE};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = MemoryConfig::load(None)?;
//!     let manager = MemoryManager::open(config).await?;
//!
//!     manager.store("editor", "helix", DEFAULT_NAMESPACE, None).await?;
//!     if let Some(value) = manager.recall("editor", DEFAULT_NAMESPACE).await? {
//!         println!("editor = {}", value);
//!     }
//!
//!     manager.close();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod manager;
pub mod namespace;
pub mod retention;
pub mod search;
pub mod storage;
pub mod transfer;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::MemoryConfig;
pub use error::{MemoryError, Result};
pub use manager::MemoryManager;
pub use retention::{RetentionPolicy, SweepReport};
pub use search::SearchStrategyKind;
pub use storage::{SqliteStorage, StorageBackend};
pub use types::{
    CachedResponse, MemoryRecord, MemoryStats, MemoryValue, Metadata, NamespaceCount, SearchHit,
    SessionEntry, ValueKind, DEFAULT_NAMESPACE,
};
