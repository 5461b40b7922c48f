//! `memory_entries` statements
//!
//! Plain synchronous functions over a borrowed connection. The pooled
//! backend calls them from inside a single transaction per operation.

use crate::error::Result;
use crate::namespace::sort_counts;
use crate::types::{
    format_timestamp, parse_timestamp, AccessSummary, MemoryRecord, MemoryValue, Metadata,
    NamespaceCount, RecentSummary, ValueKind,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

const RECORD_COLUMNS: &str = "id, key, namespace, value, value_kind, metadata, \
     created_at, updated_at, accessed_at, access_count, embedding_ref";

/// Shared ORDER BY for every record listing
const RECORD_ORDER: &str =
    "ORDER BY access_count DESC, updated_at DESC, key ASC, namespace ASC";

/// A record already converted to its stored text form
///
/// Encoding happens before any I/O so a value that cannot be serialized
/// never reaches the database.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRecord {
    pub key: String,
    pub namespace: String,
    pub value: String,
    pub value_kind: ValueKind,
    pub metadata: Option<String>,
}

impl EncodedRecord {
    pub fn encode(
        key: &str,
        namespace: &str,
        value: &MemoryValue,
        metadata: Option<&Metadata>,
    ) -> Result<Self> {
        Ok(Self {
            key: key.to_string(),
            namespace: namespace.to_string(),
            value: value.encode()?,
            value_kind: value.kind(),
            metadata: metadata.map(serde_json::to_string).transpose()?,
        })
    }
}

/// Raw column values; decoding happens outside the rusqlite row callback
struct RawRecord {
    id: i64,
    key: String,
    namespace: String,
    value: String,
    value_kind: String,
    metadata: Option<String>,
    created_at: String,
    updated_at: String,
    accessed_at: String,
    access_count: i64,
    embedding_ref: Option<String>,
}

impl RawRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            key: row.get(1)?,
            namespace: row.get(2)?,
            value: row.get(3)?,
            value_kind: row.get(4)?,
            metadata: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
            accessed_at: row.get(8)?,
            access_count: row.get(9)?,
            embedding_ref: row.get(10)?,
        })
    }

    fn into_record(self) -> Result<MemoryRecord> {
        let kind = ValueKind::parse(&self.value_kind)?;
        let metadata = match self.metadata {
            Some(json) => Some(serde_json::from_str::<Metadata>(&json)?),
            None => None,
        };

        Ok(MemoryRecord {
            id: self.id,
            value: MemoryValue::decode(kind, &self.value)?,
            key: self.key,
            namespace: self.namespace,
            metadata,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            accessed_at: parse_timestamp(&self.accessed_at)?,
            access_count: self.access_count.max(0) as u64,
            embedding_ref: self.embedding_ref,
        })
    }
}

fn query_records(conn: &Connection, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<MemoryRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let raw = stmt
        .query_map(params, RawRecord::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    raw.into_iter().map(RawRecord::into_record).collect()
}

/// Insert or replace a record
///
/// An existing row keeps `id`, `created_at`, `access_count` and
/// `accessed_at`. `updated_at` moves only when value, kind or metadata
/// actually differ, and a changed value drops the stale `embedding_ref`.
pub fn upsert(conn: &Connection, record: &EncodedRecord, now: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO memory_entries
             (key, namespace, value, value_kind, metadata,
              created_at, updated_at, accessed_at, access_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?6, 0)
         ON CONFLICT(key, namespace) DO UPDATE SET
             updated_at = CASE
                 WHEN value IS excluded.value
                  AND value_kind IS excluded.value_kind
                  AND metadata IS excluded.metadata
                 THEN updated_at ELSE excluded.updated_at END,
             embedding_ref = CASE
                 WHEN value IS excluded.value AND value_kind IS excluded.value_kind
                 THEN embedding_ref ELSE NULL END,
             value = excluded.value,
             value_kind = excluded.value_kind,
             metadata = excluded.metadata",
        params![
            record.key,
            record.namespace,
            record.value,
            record.value_kind.as_str(),
            record.metadata,
            now,
        ],
    )?;
    Ok(())
}

/// Bump access bookkeeping and return the record, or `None` if absent
pub fn fetch_and_touch(
    conn: &Connection,
    key: &str,
    namespace: &str,
    now: &str,
) -> Result<Option<MemoryRecord>> {
    let touched = conn.execute(
        "UPDATE memory_entries
         SET access_count = access_count + 1,
             accessed_at = MAX(accessed_at, ?3)
         WHERE key = ?1 AND namespace = ?2",
        params![key, namespace, now],
    )?;

    if touched == 0 {
        return Ok(None);
    }
    peek(conn, key, namespace)
}

/// Read without touching access bookkeeping
pub fn peek(conn: &Connection, key: &str, namespace: &str) -> Result<Option<MemoryRecord>> {
    let sql = format!(
        "SELECT {} FROM memory_entries WHERE key = ?1 AND namespace = ?2",
        RECORD_COLUMNS
    );
    let raw = conn
        .query_row(&sql, params![key, namespace], RawRecord::from_row)
        .optional()?;
    raw.map(RawRecord::into_record).transpose()
}

pub fn delete(conn: &Connection, key: &str, namespace: &str) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM memory_entries WHERE key = ?1 AND namespace = ?2",
        params![key, namespace],
    )?;
    Ok(deleted > 0)
}

pub fn delete_namespace(conn: &Connection, namespace: &str) -> Result<u64> {
    let deleted = conn.execute(
        "DELETE FROM memory_entries WHERE namespace = ?1",
        params![namespace],
    )?;
    Ok(deleted as u64)
}

/// Records in search order, optionally scoped to one namespace
pub fn list(conn: &Connection, namespace: Option<&str>, limit: Option<usize>) -> Result<Vec<MemoryRecord>> {
    let sql = format!(
        "SELECT {} FROM memory_entries
         WHERE (?1 IS NULL OR namespace = ?1)
         {} LIMIT ?2",
        RECORD_COLUMNS, RECORD_ORDER
    );
    let limit = limit.map(|l| l as i64).unwrap_or(-1);
    query_records(conn, &sql, &[&namespace, &limit])
}

/// Escape `%`, `_` and the escape character itself for a LIKE pattern
pub fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Case-insensitive substring match on key or serialized value
///
/// SQLite folds case for ASCII letters only. Binary payloads are matched by
/// key alone. JSON payloads are matched in their serialized form, so a `"` or
/// `\` inside a JSON string only matches when the query spells it escaped.
pub fn substring_search(
    conn: &Connection,
    query: &str,
    namespace: Option<&str>,
    limit: usize,
) -> Result<Vec<MemoryRecord>> {
    let sql = format!(
        "SELECT {} FROM memory_entries
         WHERE (?1 IS NULL OR namespace = ?1)
           AND (key LIKE ?2 ESCAPE '\\'
                OR (value_kind != 'binary' AND value LIKE ?2 ESCAPE '\\'))
         {} LIMIT ?3",
        RECORD_COLUMNS, RECORD_ORDER
    );
    let pattern = like_pattern(query);
    let limit = limit as i64;
    query_records(conn, &sql, &[&namespace, &pattern, &limit])
}

pub fn count(conn: &Connection, namespace: Option<&str>) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM memory_entries WHERE (?1 IS NULL OR namespace = ?1)",
        params![namespace],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

/// Per-namespace counts: descending by count, then ascending by name
pub fn namespace_counts(conn: &Connection) -> Result<Vec<NamespaceCount>> {
    let mut stmt =
        conn.prepare("SELECT namespace, COUNT(*) FROM memory_entries GROUP BY namespace")?;
    let mut counts = stmt
        .query_map([], |row| {
            Ok(NamespaceCount {
                namespace: row.get(0)?,
                count: row.get::<_, i64>(1)? as u64,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    sort_counts(&mut counts);
    Ok(counts)
}

pub fn most_accessed(conn: &Connection, n: usize) -> Result<Vec<AccessSummary>> {
    let sql = format!(
        "SELECT key, namespace, access_count FROM memory_entries {} LIMIT ?1",
        RECORD_ORDER
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![n as i64], |row| {
            Ok(AccessSummary {
                key: row.get(0)?,
                namespace: row.get(1)?,
                access_count: row.get::<_, i64>(2)? as u64,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn recently_updated(conn: &Connection, n: usize) -> Result<Vec<RecentSummary>> {
    let mut stmt = conn.prepare(
        "SELECT key, namespace, updated_at FROM memory_entries
         ORDER BY updated_at DESC, key ASC, namespace ASC LIMIT ?1",
    )?;
    let raw = stmt
        .query_map(params![n as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    raw.into_iter()
        .map(|(key, namespace, updated_at)| -> Result<RecentSummary> {
            Ok(RecentSummary {
                key,
                namespace,
                updated_at: parse_timestamp(&updated_at)?,
            })
        })
        .collect()
}

/// Point a record at its cached search vector
///
/// Only applies while the record still holds the value the vector was
/// computed from, so a concurrent overwrite is never mislabeled.
pub fn set_embedding_ref(
    conn: &Connection,
    id: i64,
    expected_value: &str,
    content_hash: &str,
) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE memory_entries SET embedding_ref = ?3 WHERE id = ?1 AND value = ?2",
        params![id, expected_value, content_hash],
    )?;
    Ok(updated > 0)
}

/// Delete records last updated before `cutoff`
pub fn purge_older_than(conn: &Connection, cutoff: &str) -> Result<u64> {
    let deleted = conn.execute(
        "DELETE FROM memory_entries WHERE updated_at < ?1",
        params![cutoff],
    )?;
    Ok(deleted as u64)
}

/// Current time in the persisted timestamp form
pub fn now_timestamp() -> String {
    format_timestamp(&chrono::Utc::now())
}
