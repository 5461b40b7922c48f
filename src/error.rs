//! Error types for the DeepCLI memory store
//!
//! Library code returns [`MemoryError`] through the [`Result`] alias. Absence is
//! never an error here: `recall` misses and `forget` misses are ordinary return
//! values, so every variant below describes something that actually went wrong.

use thiserror::Error;

/// Main error type for memory operations
#[derive(Error, Debug)]
pub enum MemoryError {
    /// Underlying I/O or database failure (disk full, corrupt file, permission denied)
    #[error("Storage error: {0}")]
    Storage(String),

    /// A value could not be converted to or from its stored text form
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Caller input rejected before any I/O was attempted
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration could not be loaded or is out of range
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MemoryError {
    /// Stable, lowercase name of the error kind (used by the CLI)
    pub fn kind(&self) -> &'static str {
        match self {
            MemoryError::Storage(_) => "storage",
            MemoryError::Serialization(_) => "serialization",
            MemoryError::Validation(_) => "validation",
            MemoryError::Config(_) => "config",
        }
    }

    /// True for failures of the storage layer itself
    pub fn is_storage(&self) -> bool {
        matches!(self, MemoryError::Storage(_))
    }
}

/// Result type alias for memory operations
pub type Result<T> = std::result::Result<T, MemoryError>;

impl From<rusqlite::Error> for MemoryError {
    fn from(err: rusqlite::Error) -> Self {
        MemoryError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for MemoryError {
    fn from(err: std::io::Error) -> Self {
        MemoryError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for MemoryError {
    fn from(err: serde_json::Error) -> Self {
        MemoryError::Serialization(err.to_string())
    }
}

impl From<base64::DecodeError> for MemoryError {
    fn from(err: base64::DecodeError) -> Self {
        MemoryError::Serialization(format!("invalid base64 payload: {}", err))
    }
}

impl From<config::ConfigError> for MemoryError {
    fn from(err: config::ConfigError) -> Self {
        MemoryError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for MemoryError {
    fn from(err: toml::de::Error) -> Self {
        MemoryError::Config(err.to_string())
    }
}
