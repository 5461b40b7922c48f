//! Memory recall command

use anyhow::Result;
use deepcli_memory::types::format_timestamp;
use deepcli_memory::MemoryManager;
use serde_json::json;

use super::helpers::print_json;
use super::OutputFormat;

/// Handle `recall KEY`
///
/// A miss is not a failure: it prints a notice and exits successfully.
pub async fn handle(
    manager: &MemoryManager,
    key: String,
    namespace: String,
    format: OutputFormat,
) -> Result<()> {
    let record = manager.recall_record(&key, &namespace).await?;

    match (format, record) {
        (OutputFormat::Json, Some(record)) => print_json(&json!({
            "found": true,
            "key": record.key,
            "namespace": record.namespace,
            "value": record.value.to_json(),
            "value_kind": record.value.kind(),
            "metadata": record.metadata,
            "access_count": record.access_count,
            "created_at": format_timestamp(&record.created_at),
            "updated_at": format_timestamp(&record.updated_at),
        }))?,
        (OutputFormat::Json, None) => print_json(&json!({
            "found": false,
            "key": key,
            "namespace": namespace,
        }))?,
        (OutputFormat::Text, Some(record)) => println!("{}", record.value),
        (OutputFormat::Text, None) => eprintln!("No memory stored for {}/{}", namespace, key),
    }
    Ok(())
}
