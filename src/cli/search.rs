//! Memory search command

use anyhow::Result;
use deepcli_memory::utils::string::preview;
use deepcli_memory::MemoryManager;
use serde_json::json;

use super::helpers::print_json;
use super::OutputFormat;

/// Handle `search [QUERY]`
pub async fn handle(
    manager: &MemoryManager,
    query: String,
    namespace: Option<String>,
    limit: usize,
    format: OutputFormat,
) -> Result<()> {
    let hits = manager.search(&query, namespace.as_deref(), limit).await?;

    if format == OutputFormat::Json {
        let results: Vec<_> = hits.iter().map(|hit| hit.to_json()).collect();
        return print_json(&json!({
            "query": query,
            "strategy": manager.strategy().to_string(),
            "count": results.len(),
            "results": results,
        }));
    }

    if hits.is_empty() {
        println!("No memories found matching '{}'", query);
        return Ok(());
    }

    println!("Found {} memories:\n", hits.len());
    for (i, hit) in hits.iter().enumerate() {
        println!(
            "{}. {}/{} (score: {:.2}, accessed: {})",
            i + 1,
            hit.namespace,
            hit.key,
            hit.score,
            hit.access_count
        );
        println!("   {}\n", preview(&hit.value.to_string(), 100));
    }
    Ok(())
}
