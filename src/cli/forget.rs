//! Forget and clear commands

use anyhow::Result;
use deepcli_memory::MemoryManager;
use serde_json::json;

use super::helpers::print_json;
use super::OutputFormat;

/// Handle `forget KEY`
pub async fn handle(
    manager: &MemoryManager,
    key: String,
    namespace: String,
    format: OutputFormat,
) -> Result<()> {
    let deleted = manager.forget(&key, &namespace).await?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "deleted": deleted,
            "key": key,
            "namespace": namespace,
        }))?,
        OutputFormat::Text if deleted => println!("Forgot {}/{}", namespace, key),
        OutputFormat::Text => println!("Nothing stored for {}/{}", namespace, key),
    }
    Ok(())
}

/// Handle `clear NAMESPACE`
pub async fn handle_clear(manager: &MemoryManager, namespace: String, format: OutputFormat) -> Result<()> {
    let deleted = manager.clear_namespace(&namespace).await?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "namespace": namespace,
            "deleted": deleted,
        }))?,
        OutputFormat::Text => println!("Deleted {} memories from '{}'", deleted, namespace),
    }
    Ok(())
}
