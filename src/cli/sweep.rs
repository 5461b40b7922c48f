//! Retention sweep command

use anyhow::Result;
use deepcli_memory::{MemoryManager, RetentionPolicy};

use super::helpers::print_json;
use super::OutputFormat;

/// Handle `sweep`; flags override the configured thresholds
pub async fn handle(
    manager: &MemoryManager,
    max_age_days: Option<u32>,
    session_max_age_days: Option<u32>,
    cache_max_age_days: Option<u32>,
    format: OutputFormat,
) -> Result<()> {
    let mut policy = RetentionPolicy::from(&manager.config().retention);
    if let Some(days) = max_age_days {
        policy.max_age_days = days;
    }
    if let Some(days) = session_max_age_days {
        policy.session_max_age_days = days;
    }
    if let Some(days) = cache_max_age_days {
        policy.response_cache_max_age_days = days;
    }

    let report = manager.sweep_with(policy).await?;

    match format {
        OutputFormat::Json => {
            let mut value = serde_json::to_value(report)?;
            value["total"] = report.total().into();
            print_json(&value)?
        }
        OutputFormat::Text if report.total() == 0 => println!("Nothing to remove"),
        OutputFormat::Text => println!("Removed {} rows: {}", report.total(), report),
    }
    Ok(())
}
