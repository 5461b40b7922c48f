//! Memory store command

use anyhow::{Context, Result};
use deepcli_memory::{MemoryError, MemoryManager, MemoryValue};
use serde_json::json;
use std::path::PathBuf;

use super::helpers::{parse_metadata, print_json};
use super::OutputFormat;

/// Handle `store KEY [VALUE]`
#[allow(clippy::too_many_arguments)]
pub async fn handle(
    manager: &MemoryManager,
    key: String,
    value: Option<String>,
    namespace: String,
    as_json: bool,
    binary_file: Option<PathBuf>,
    metadata: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let value = match (value, binary_file) {
        (None, Some(path)) => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            MemoryValue::Binary(bytes)
        }
        (Some(raw), None) if as_json => {
            let parsed = serde_json::from_str(&raw).map_err(|e| {
                MemoryError::Validation(format!("value is not valid JSON: {}", e))
            })?;
            MemoryValue::Json(parsed)
        }
        (Some(raw), None) => MemoryValue::Text(raw),
        (Some(_), Some(_)) => {
            return Err(MemoryError::Validation(
                "give either VALUE or --binary-file, not both".into(),
            )
            .into())
        }
        (None, None) => {
            return Err(MemoryError::Validation("VALUE or --binary-file is required".into()).into())
        }
    };

    let kind = value.kind();
    let metadata = parse_metadata(metadata.as_deref())?;
    manager.store(&key, value, &namespace, metadata).await?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "stored": true,
            "key": key,
            "namespace": namespace,
            "value_kind": kind,
        }))?,
        OutputFormat::Text => println!("Stored {}/{} ({})", namespace, key, kind),
    }
    Ok(())
}
