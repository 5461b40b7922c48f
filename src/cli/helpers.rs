//! Shared helper functions for CLI commands

use anyhow::{Context, Result};
use deepcli_memory::config::default_config_path;
use deepcli_memory::{MemoryConfig, MemoryError, Metadata};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Load layered configuration, then apply the `--db-path` override
///
/// Without `--config`, the default config file is used if it exists.
pub fn load_config(config_path: Option<&Path>, db_path: Option<PathBuf>) -> Result<MemoryConfig> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);
    debug!("Using config file: {}", path.display());

    let mut config = MemoryConfig::load(Some(&path))
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;

    if let Some(db_path) = db_path {
        config.storage.db_path = deepcli_memory::config::expand_home(&db_path);
    }
    config.validate()?;
    Ok(config)
}

/// Parse a `--metadata` argument, which must be a JSON object
pub fn parse_metadata(raw: Option<&str>) -> Result<Option<Metadata>, MemoryError> {
    raw.map(|raw| {
        serde_json::from_str::<Metadata>(raw).map_err(|e| {
            MemoryError::Validation(format!("--metadata must be a JSON object: {}", e))
        })
    })
    .transpose()
}

/// Print a JSON value to stdout
pub fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_metadata() {
        assert_eq!(parse_metadata(None).unwrap(), None);

        let parsed = parse_metadata(Some(r#"{"source": "agent"}"#)).unwrap().unwrap();
        assert_eq!(parsed["source"], "agent");

        assert!(matches!(
            parse_metadata(Some("[1, 2]")),
            Err(MemoryError::Validation(_))
        ));
    }
}
