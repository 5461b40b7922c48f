//! Session log commands

use anyhow::Result;
use deepcli_memory::types::format_timestamp;
use deepcli_memory::utils::string::preview;
use deepcli_memory::MemoryManager;
use serde_json::json;
use uuid::Uuid;

use super::helpers::print_json;
use super::OutputFormat;

/// Handle `session append`; a missing session id gets a fresh UUID
pub async fn handle_append(
    manager: &MemoryManager,
    session_id: Option<String>,
    request: String,
    response: String,
    tags: Vec<String>,
    format: OutputFormat,
) -> Result<()> {
    let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let entry = manager
        .append_session(&session_id, &request, &response, tags)
        .await?;

    match format {
        OutputFormat::Json => print_json(&serde_json::to_value(&entry)?)?,
        OutputFormat::Text => println!("Appended entry {} to session {}", entry.id, entry.session_id),
    }
    Ok(())
}

/// Handle `session show SESSION_ID`
pub async fn handle_show(
    manager: &MemoryManager,
    session_id: String,
    limit: usize,
    format: OutputFormat,
) -> Result<()> {
    let entries = manager.session_history(&session_id, limit).await?;

    if format == OutputFormat::Json {
        return print_json(&json!({
            "session_id": session_id,
            "count": entries.len(),
            "entries": entries,
        }));
    }

    if entries.is_empty() {
        println!("No entries for session {}", session_id);
        return Ok(());
    }

    for entry in &entries {
        let tags = if entry.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", entry.tags.join(", "))
        };
        println!("{}{}", format_timestamp(&entry.timestamp), tags);
        println!("  > {}", preview(&entry.request_text, 200));
        println!("  < {}\n", preview(&entry.response_text, 200));
    }
    Ok(())
}
