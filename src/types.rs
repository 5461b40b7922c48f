//! Core data types for the DeepCLI memory store
//!
//! This module defines the records, payloads and summaries that flow between
//! the storage layer, the search strategies and the [`MemoryManager`] facade.
//!
//! [`MemoryManager`]: crate::manager::MemoryManager

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MemoryError, Result};

/// Namespace used when the caller does not name one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Caller-supplied auxiliary data, opaque to the store
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Type tag persisted next to every value
///
/// The tag lets `recall` rebuild the original shape instead of always
/// handing back a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// Plain UTF-8 text, stored verbatim
    Text,

    /// Structured JSON, stored in compact serialized form
    Json,

    /// Raw bytes, stored base64-encoded
    Binary,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Text => "text",
            ValueKind::Json => "json",
            ValueKind::Binary => "binary",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(ValueKind::Text),
            "json" => Ok(ValueKind::Json),
            "binary" => Ok(ValueKind::Binary),
            other => Err(MemoryError::Serialization(format!(
                "unknown value kind '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored payload together with its interpretation
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryValue {
    Text(String),
    Json(serde_json::Value),
    Binary(Vec<u8>),
}

impl MemoryValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            MemoryValue::Text(_) => ValueKind::Text,
            MemoryValue::Json(_) => ValueKind::Json,
            MemoryValue::Binary(_) => ValueKind::Binary,
        }
    }

    /// Serialize to the canonical text form kept in the `value` column
    pub fn encode(&self) -> Result<String> {
        match self {
            MemoryValue::Text(s) => Ok(s.clone()),
            MemoryValue::Json(v) => Ok(serde_json::to_string(v)?),
            MemoryValue::Binary(bytes) => Ok(BASE64.encode(bytes)),
        }
    }

    /// Rebuild a value from its stored text form and type tag
    pub fn decode(kind: ValueKind, stored: &str) -> Result<Self> {
        match kind {
            ValueKind::Text => Ok(MemoryValue::Text(stored.to_string())),
            ValueKind::Json => Ok(MemoryValue::Json(serde_json::from_str(stored)?)),
            ValueKind::Binary => Ok(MemoryValue::Binary(BASE64.decode(stored)?)),
        }
    }

    /// JSON rendering used by export documents and `--format json` output
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            MemoryValue::Text(s) => serde_json::Value::String(s.clone()),
            MemoryValue::Json(v) => v.clone(),
            MemoryValue::Binary(bytes) => serde_json::Value::String(BASE64.encode(bytes)),
        }
    }

    /// Inverse of [`MemoryValue::to_json`]
    ///
    /// Without an explicit kind (hand-authored import files), JSON strings
    /// become text and everything else stays structured JSON.
    pub fn from_json(value: serde_json::Value, kind: Option<ValueKind>) -> Result<Self> {
        match (kind, value) {
            (None, serde_json::Value::String(s)) | (Some(ValueKind::Text), serde_json::Value::String(s)) => {
                Ok(MemoryValue::Text(s))
            }
            (None, other) | (Some(ValueKind::Json), other) => Ok(MemoryValue::Json(other)),
            (Some(ValueKind::Binary), serde_json::Value::String(s)) => {
                Ok(MemoryValue::Binary(BASE64.decode(s.as_bytes())?))
            }
            (Some(kind), other) => Err(MemoryError::Serialization(format!(
                "a {} value must be a JSON string, got {}",
                kind, other
            ))),
        }
    }

    /// Text that search strategies match against (empty for binary payloads)
    pub fn searchable_text(&self) -> String {
        match self {
            MemoryValue::Text(s) => s.clone(),
            MemoryValue::Json(v) => v.to_string(),
            MemoryValue::Binary(_) => String::new(),
        }
    }
}

impl fmt::Display for MemoryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryValue::Text(s) => f.write_str(s),
            MemoryValue::Json(v) => write!(f, "{}", v),
            MemoryValue::Binary(bytes) => write!(f, "<binary: {} bytes>", bytes.len()),
        }
    }
}

impl From<&str> for MemoryValue {
    fn from(s: &str) -> Self {
        MemoryValue::Text(s.to_string())
    }
}

impl From<String> for MemoryValue {
    fn from(s: String) -> Self {
        MemoryValue::Text(s)
    }
}

impl From<serde_json::Value> for MemoryValue {
    fn from(v: serde_json::Value) -> Self {
        MemoryValue::Json(v)
    }
}

impl From<Vec<u8>> for MemoryValue {
    fn from(bytes: Vec<u8>) -> Self {
        MemoryValue::Binary(bytes)
    }
}

/// A single stored value with its bookkeeping
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRecord {
    /// Row id (auto-assigned, stable across upserts)
    pub id: i64,

    /// Caller-chosen identifier, unique within a namespace
    pub key: String,

    /// Logical partition
    pub namespace: String,

    pub value: MemoryValue,

    pub metadata: Option<Metadata>,

    pub created_at: DateTime<Utc>,

    /// Refreshed only when the value or metadata actually changes
    pub updated_at: DateTime<Utc>,

    pub accessed_at: DateTime<Utc>,

    /// Successful recalls since creation
    pub access_count: u64,

    /// Content hash of the cached search vector, if one has been computed
    pub embedding_ref: Option<String>,
}

/// Append-only record of one request/response exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub id: i64,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub request_text: String,
    pub response_text: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One ranked search result
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub key: String,
    pub namespace: String,
    pub value: MemoryValue,
    pub metadata: Option<Metadata>,

    /// 1.0 for substring matches, cosine similarity for TF-IDF
    pub score: f32,

    pub access_count: u64,
    pub updated_at: DateTime<Utc>,
}

impl SearchHit {
    pub fn from_record(record: MemoryRecord, score: f32) -> Self {
        Self {
            key: record.key,
            namespace: record.namespace,
            value: record.value,
            metadata: record.metadata,
            score,
            access_count: record.access_count,
            updated_at: record.updated_at,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "key": self.key,
            "namespace": self.namespace,
            "value": self.value.to_json(),
            "value_kind": self.value.kind(),
            "metadata": self.metadata,
            "score": self.score,
            "access_count": self.access_count,
            "updated_at": format_timestamp(&self.updated_at),
        })
    }
}

/// Record count for one namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceCount {
    pub namespace: String,
    pub count: u64,
}

/// Entry in the most-accessed list of [`MemoryStats`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessSummary {
    pub key: String,
    pub namespace: String,
    pub access_count: u64,
}

/// Entry in the recently-updated list of [`MemoryStats`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentSummary {
    pub key: String,
    pub namespace: String,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate view returned by `get_stats`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryStats {
    pub total: u64,

    /// Descending by count, then ascending by name
    pub per_namespace: Vec<NamespaceCount>,

    pub most_accessed: Vec<AccessSummary>,
    pub recent: Vec<RecentSummary>,
    pub sessions: u64,
    pub search_vectors: u64,
    pub cached_responses: u64,
}

/// A cached model response keyed by prompt hash
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedResponse {
    pub prompt_hash: String,
    pub model: String,
    pub response: String,
    pub tokens_used: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub hit_count: u64,
}

/// Fixed-width RFC 3339 form used for every persisted timestamp
///
/// Microsecond precision and a literal `Z` keep the strings lexicographically
/// ordered, which the ORDER BY clauses and retention cutoffs rely on.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| MemoryError::Serialization(format!("invalid timestamp '{}': {}", s, e)))
}
