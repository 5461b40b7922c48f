//! Namespace import command

use anyhow::Result;
use deepcli_memory::MemoryManager;
use serde_json::json;
use std::path::PathBuf;

use super::helpers::print_json;
use super::OutputFormat;

/// Handle `import PATH [-n NAMESPACE]`
pub async fn handle(
    manager: &MemoryManager,
    path: PathBuf,
    namespace: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let imported = manager.import_namespace(&path, namespace.as_deref()).await?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "path": path.display().to_string(),
            "namespace": namespace,
            "imported": imported,
        }))?,
        OutputFormat::Text => println!("Imported {} memories from {}", imported, path.display()),
    }
    Ok(())
}
