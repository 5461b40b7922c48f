//! Namespace listing command

use anyhow::Result;
use deepcli_memory::MemoryManager;
use serde_json::json;

use super::helpers::print_json;
use super::OutputFormat;

/// Handle `namespaces`: names with their record counts, largest first
pub async fn handle(manager: &MemoryManager, format: OutputFormat) -> Result<()> {
    let counts = manager.namespace_counts().await?;

    match format {
        OutputFormat::Json => print_json(&json!({ "namespaces": counts }))?,
        OutputFormat::Text if counts.is_empty() => println!("No namespaces yet"),
        OutputFormat::Text => {
            let width = counts.iter().map(|c| c.namespace.len()).max().unwrap_or(0);
            for count in &counts {
                println!("{:<width$}  {}", count.namespace, count.count, width = width);
            }
        }
    }
    Ok(())
}
