//! Store statistics command

use anyhow::Result;
use deepcli_memory::types::format_timestamp;
use deepcli_memory::MemoryManager;

use super::helpers::print_json;
use super::OutputFormat;

/// Handle `stats`
pub async fn handle(manager: &MemoryManager, top: usize, format: OutputFormat) -> Result<()> {
    let stats = manager.get_stats_top(top).await?;

    if format == OutputFormat::Json {
        return print_json(&serde_json::to_value(&stats)?);
    }

    println!("Memories:         {}", stats.total);
    println!("Session entries:  {}", stats.sessions);
    println!("Search vectors:   {}", stats.search_vectors);
    println!("Cached responses: {}", stats.cached_responses);

    if !stats.per_namespace.is_empty() {
        println!("\nBy namespace:");
        for count in &stats.per_namespace {
            println!("  {}: {}", count.namespace, count.count);
        }
    }

    if !stats.most_accessed.is_empty() {
        println!("\nMost accessed:");
        for entry in &stats.most_accessed {
            println!("  {}/{} ({})", entry.namespace, entry.key, entry.access_count);
        }
    }

    if !stats.recent.is_empty() {
        println!("\nRecently updated:");
        for entry in &stats.recent {
            println!(
                "  {}/{} ({})",
                entry.namespace,
                entry.key,
                format_timestamp(&entry.updated_at)
            );
        }
    }
    Ok(())
}
