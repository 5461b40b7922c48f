//! Append-only session log

use crate::error::Result;
use crate::types::{parse_timestamp, SessionEntry};
use rusqlite::{params, Connection};

/// Insert one exchange and return it with its assigned id
pub fn append(
    conn: &Connection,
    session_id: &str,
    request_text: &str,
    response_text: &str,
    tags: &[String],
    now: &str,
) -> Result<SessionEntry> {
    let tags_json = if tags.is_empty() {
        None
    } else {
        Some(serde_json::to_string(tags)?)
    };

    conn.execute(
        "INSERT INTO sessions (session_id, request_text, response_text, timestamp, tags)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![session_id, request_text, response_text, now, tags_json],
    )?;

    Ok(SessionEntry {
        id: conn.last_insert_rowid(),
        session_id: session_id.to_string(),
        timestamp: parse_timestamp(now)?,
        request_text: request_text.to_string(),
        response_text: response_text.to_string(),
        tags: tags.to_vec(),
    })
}

/// The newest `limit` entries of a session, returned oldest first
pub fn history(conn: &Connection, session_id: &str, limit: usize) -> Result<Vec<SessionEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, session_id, request_text, response_text, timestamp, tags
         FROM sessions WHERE session_id = ?1
         ORDER BY id DESC LIMIT ?2",
    )?;

    let raw = stmt
        .query_map(params![session_id, limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut entries = raw
        .into_iter()
        .map(|(id, session_id, request_text, response_text, timestamp, tags)| -> Result<SessionEntry> {
            Ok(SessionEntry {
                id,
                session_id,
                timestamp: parse_timestamp(&timestamp)?,
                request_text,
                response_text,
                tags: match tags {
                    Some(json) => serde_json::from_str(&json)?,
                    None => Vec::new(),
                },
            })
        })
        .collect::<Result<Vec<_>>>()?;

    entries.reverse();
    Ok(entries)
}

pub fn count(conn: &Connection) -> Result<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
    Ok(count as u64)
}

pub fn purge_older_than(conn: &Connection, cutoff: &str) -> Result<u64> {
    let deleted = conn.execute("DELETE FROM sessions WHERE timestamp < ?1", params![cutoff])?;
    Ok(deleted as u64)
}
