//! Namespace export command

use anyhow::Result;
use deepcli_memory::MemoryManager;
use serde_json::json;
use std::path::PathBuf;

use super::helpers::print_json;
use super::OutputFormat;

/// Handle `export NAMESPACE PATH`
pub async fn handle(
    manager: &MemoryManager,
    namespace: String,
    path: PathBuf,
    format: OutputFormat,
) -> Result<()> {
    let count = manager.export_namespace(&namespace, &path).await?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "namespace": namespace,
            "path": path.display().to_string(),
            "count": count,
        }))?,
        OutputFormat::Text => println!(
            "Exported {} memories from '{}' to {}",
            count,
            namespace,
            path.display()
        ),
    }
    Ok(())
}
