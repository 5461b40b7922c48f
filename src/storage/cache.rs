//! Model response cache
//!
//! Responses are keyed by `sha256(model || 0x00 || prompt)`, so the same
//! prompt sent to two models caches twice.

use crate::error::Result;
use crate::types::{parse_timestamp, CachedResponse};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

pub fn prompt_hash(model: &str, prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model.as_bytes());
    hasher.update([0u8]);
    hasher.update(prompt.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Insert or replace a response; replacing resets the hit count
pub fn put(
    conn: &Connection,
    prompt_hash: &str,
    model: &str,
    response: &str,
    tokens_used: Option<i64>,
    now: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO response_cache (prompt_hash, model, response, tokens_used, created_at, hit_count)
         VALUES (?1, ?2, ?3, ?4, ?5, 0)
         ON CONFLICT(prompt_hash) DO UPDATE SET
             model = excluded.model,
             response = excluded.response,
             tokens_used = excluded.tokens_used,
             created_at = excluded.created_at,
             hit_count = 0",
        params![prompt_hash, model, response, tokens_used, now],
    )?;
    Ok(())
}

/// Look up a response, counting the hit
pub fn get_and_hit(conn: &Connection, prompt_hash: &str) -> Result<Option<CachedResponse>> {
    let hit = conn.execute(
        "UPDATE response_cache SET hit_count = hit_count + 1 WHERE prompt_hash = ?1",
        params![prompt_hash],
    )?;
    if hit == 0 {
        return Ok(None);
    }

    let raw = conn
        .query_row(
            "SELECT prompt_hash, model, response, tokens_used, created_at, hit_count
             FROM response_cache WHERE prompt_hash = ?1",
            params![prompt_hash],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            },
        )
        .optional()?;

    raw.map(|(prompt_hash, model, response, tokens_used, created_at, hit_count)| -> Result<CachedResponse> {
        Ok(CachedResponse {
            prompt_hash,
            model,
            response,
            tokens_used,
            created_at: parse_timestamp(&created_at)?,
            hit_count: hit_count as u64,
        })
    })
    .transpose()
}

pub fn count(conn: &Connection) -> Result<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM response_cache", [], |row| row.get(0))?;
    Ok(count as u64)
}

pub fn purge_older_than(conn: &Connection, cutoff: &str) -> Result<u64> {
    let deleted = conn.execute(
        "DELETE FROM response_cache WHERE created_at < ?1",
        params![cutoff],
    )?;
    Ok(deleted as u64)
}
