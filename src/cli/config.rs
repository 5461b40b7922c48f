//! Configuration commands

use anyhow::Result;
use deepcli_memory::MemoryConfig;

use super::helpers::print_json;
use super::OutputFormat;

/// Handle `config show`: print the effective, fully layered configuration
pub fn handle_show(config: &MemoryConfig, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&serde_json::to_value(config)?)?,
        OutputFormat::Text => print!("{}", config.to_toml()?),
    }
    Ok(())
}
