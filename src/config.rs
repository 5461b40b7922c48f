//! Configuration for the memory store
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables prefixed `DEEPCLI_MEMORY_` (sections separated by
//! `__`, e.g. `DEEPCLI_MEMORY_SEARCH__STRATEGY=tfidf`).

use crate::error::{MemoryError, Result};
use crate::search::SearchStrategyKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "DEEPCLI_MEMORY";

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MemoryConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub retention: RetentionConfig,

    #[serde(default)]
    pub sessions: SessionConfig,
}

/// Database location and pooling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    pub db_path: PathBuf,

    /// Maximum pooled connections
    pub pool_size: usize,
}

/// Search strategy and TF-IDF parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub strategy: SearchStrategyKind,

    /// Fixed vector dimension `D`
    pub dimension: usize,

    /// Minimum cosine similarity for a TF-IDF hit
    pub similarity_threshold: f32,

    /// Normalized text is cut to this many characters
    pub max_text_len: usize,

    /// Upper bound on records scored per TF-IDF search
    pub max_candidates: usize,

    /// Optional seed corpus (one document per line) replacing the built-in one
    pub seed_corpus_path: Option<PathBuf>,
}

/// Age thresholds for the retention sweep, in days (0 disables)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub max_age_days: u32,
    pub session_max_age_days: u32,
    pub response_cache_max_age_days: u32,
}

/// Session log options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SessionConfig {
    /// When set, every session entry is also appended to a per-session `.jsonl` file here
    pub mirror_dir: Option<PathBuf>,
}

/// Get the default database path using the platform data directory
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("deepcli")
        .join("memory.db")
}

/// Default location of the TOML config file
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("deepcli")
        .join("memory.toml")
}

/// Expand a leading `~/` to the user's home directory
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            pool_size: 4,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            strategy: SearchStrategyKind::Substring,
            dimension: 512,
            similarity_threshold: 0.1,
            max_text_len: 1000,
            max_candidates: 5000,
            seed_corpus_path: None,
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age_days: 365,
            session_max_age_days: 30,
            response_cache_max_age_days: 7,
        }
    }
}

impl MemoryConfig {
    /// Configuration rooted at a specific database file, everything else default
    pub fn with_db_path(path: impl Into<PathBuf>) -> Self {
        let mut config = Self::default();
        config.storage.db_path = path.into();
        config
    }

    /// Load defaults, then `path` (if given and present), then the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = config::Config::try_from(&MemoryConfig::default())?;
        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            debug!("Loading memory config from {}", path.display());
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let layered = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let mut config: MemoryConfig = layered.try_deserialize()?;
        config.expand_paths();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document on its own (no environment layer)
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let mut config: MemoryConfig = toml::from_str(toml_str)?;
        config.expand_paths();
        config.validate()?;
        Ok(config)
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| MemoryError::Config(e.to_string()))
    }

    fn expand_paths(&mut self) {
        self.storage.db_path = expand_home(&self.storage.db_path);
        self.search.seed_corpus_path = self.search.seed_corpus_path.as_deref().map(expand_home);
        self.sessions.mirror_dir = self.sessions.mirror_dir.as_deref().map(expand_home);
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.storage.db_path.as_os_str().is_empty() {
            return Err(MemoryError::Config("storage.db_path must not be empty".into()));
        }

        if self.storage.pool_size == 0 || self.storage.pool_size > 64 {
            return Err(MemoryError::Config(
                "storage.pool_size must be between 1 and 64".into(),
            ));
        }

        if self.search.dimension < 8 || self.search.dimension > 8192 {
            return Err(MemoryError::Config(
                "search.dimension must be between 8 and 8192".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.search.similarity_threshold) {
            return Err(MemoryError::Config(
                "search.similarity_threshold must be between 0.0 and 1.0".into(),
            ));
        }

        if self.search.max_text_len == 0 {
            return Err(MemoryError::Config("search.max_text_len must be positive".into()));
        }

        if self.search.max_candidates == 0 {
            return Err(MemoryError::Config("search.max_candidates must be positive".into()));
        }

        Ok(())
    }
}
