//! Content-addressed search vector cache
//!
//! Vectors are keyed by the SHA-256 of the normalized text they were computed
//! from, so records with identical normalized content share one row. Each row
//! remembers the dimension and the fingerprint of the vectorizer that produced
//! it; a row from a different model is treated as a miss and overwritten.

use crate::error::{MemoryError, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;

/// Serialize f32 vector to little-endian bytes
pub fn serialize_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize little-endian bytes to an f32 vector
pub fn deserialize_vector(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(MemoryError::Serialization(format!(
            "invalid vector byte length {}",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Fetch many cached vectors at once; hashes without a usable row are omitted
pub fn load_many(
    conn: &Connection,
    content_hashes: &[String],
    fingerprint: &str,
) -> Result<HashMap<String, Vec<f32>>> {
    let mut stmt = conn.prepare_cached(
        "SELECT vector FROM search_vectors
         WHERE content_hash = ?1 AND model_fingerprint = ?2",
    )?;

    let mut found = HashMap::new();
    for hash in content_hashes {
        if found.contains_key(hash) {
            continue;
        }
        let blob: Option<Vec<u8>> = stmt
            .query_row(params![hash, fingerprint], |row| row.get(0))
            .optional()?;
        if let Some(bytes) = blob {
            found.insert(hash.clone(), deserialize_vector(&bytes)?);
        }
    }
    Ok(found)
}

/// Insert or overwrite a vector
pub fn save(
    conn: &Connection,
    content_hash: &str,
    vector: &[f32],
    fingerprint: &str,
    now: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO search_vectors (content_hash, vector, dimension, model_fingerprint, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(content_hash) DO UPDATE SET
             vector = excluded.vector,
             dimension = excluded.dimension,
             model_fingerprint = excluded.model_fingerprint,
             created_at = excluded.created_at",
        params![
            content_hash,
            serialize_vector(vector),
            vector.len() as i64,
            fingerprint,
            now
        ],
    )?;
    Ok(())
}

/// Delete vectors no record points at any more
pub fn prune_orphans(conn: &Connection) -> Result<u64> {
    let deleted = conn.execute(
        "DELETE FROM search_vectors
         WHERE content_hash NOT IN (
             SELECT embedding_ref FROM memory_entries WHERE embedding_ref IS NOT NULL
         )",
        [],
    )?;
    Ok(deleted as u64)
}

pub fn count(conn: &Connection) -> Result<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM search_vectors", [], |row| row.get(0))?;
    Ok(count as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::apply_schema;

    const NOW: &str = "2026-01-01T00:00:00.000000Z";

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn
    }

    fn load_one(conn: &Connection, hash: &str, fingerprint: &str) -> Option<Vec<f32>> {
        load_many(conn, &[hash.to_string()], fingerprint)
            .unwrap()
            .remove(hash)
    }

    #[test]
    fn test_vector_bytes() {
        let vector = vec![0.5f32, -1.25, 3.0];
        let bytes = serialize_vector(&vector);
        assert_eq!(bytes.len(), 12);
        assert_eq!(deserialize_vector(&bytes).unwrap(), vector);
        assert!(deserialize_vector(&bytes[..5]).is_err());
    }

    #[test]
    fn test_fingerprint_mismatch_is_a_miss() {
        let conn = conn();
        save(&conn, "h1", &[1.0, 0.0], "model-a", NOW).unwrap();

        assert_eq!(load_one(&conn, "h1", "model-a"), Some(vec![1.0, 0.0]));
        assert_eq!(load_one(&conn, "h1", "model-b"), None);

        save(&conn, "h1", &[0.0, 1.0], "model-b", NOW).unwrap();
        assert_eq!(load_one(&conn, "h1", "model-b"), Some(vec![0.0, 1.0]));
        assert_eq!(count(&conn).unwrap(), 1);
    }

    #[test]
    fn test_load_many_skips_missing() {
        let conn = conn();
        save(&conn, "h1", &[1.0], "m", NOW).unwrap();

        let found = load_many(&conn, &["h1".to_string(), "h2".to_string()], "m").unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains_key("h1"));
    }

    #[test]
    fn test_prune_orphans_keeps_referenced() {
        let conn = conn();
        save(&conn, "kept", &[1.0], "m", NOW).unwrap();
        save(&conn, "orphan", &[1.0], "m", NOW).unwrap();
        conn.execute(
            "INSERT INTO memory_entries
                (key, namespace, value, created_at, updated_at, accessed_at, embedding_ref)
             VALUES ('k', 'default', 'v', ?1, ?1, ?1, 'kept')",
            params![NOW],
        )
        .unwrap();

        assert_eq!(prune_orphans(&conn).unwrap(), 1);
        assert!(load_one(&conn, "kept", "m").is_some());
        assert!(load_one(&conn, "orphan", "m").is_none());
    }
}
