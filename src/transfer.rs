//! Namespace export documents
//!
//! ```json
//! {
//!   "namespace": "work",
//!   "exported_at": "2026-01-01T00:00:00.000000Z",
//!   "count": 1,
//!   "memories": [
//!     {"key": "k", "value": "v", "value_kind": "text", "namespace": "work",
//!      "metadata": null, "updated_at": "2026-01-01T00:00:00.000000Z"}
//!   ]
//! }
//! ```
//!
//! `value_kind` is optional on import so hand-authored documents work: a JSON
//! string becomes text, anything else stays structured JSON. Binary values
//! are exported as base64 strings tagged `"binary"`.

use crate::error::{MemoryError, Result};
use crate::namespace::{validate_key, validate_namespace};
use crate::storage::EncodedRecord;
use crate::types::{format_timestamp, MemoryRecord, MemoryValue, Metadata, ValueKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A whole exported namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub namespace: String,
    pub exported_at: String,
    pub count: usize,
    pub memories: Vec<ExportedMemory>,
}

/// One record inside an [`ExportDocument`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedMemory {
    pub key: String,

    pub value: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_kind: Option<ValueKind>,

    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(default)]
    pub metadata: Option<Metadata>,

    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Records ready to upsert, plus how many entries were unusable
#[derive(Debug, Clone)]
pub struct ImportPlan {
    pub namespace: String,
    pub records: Vec<EncodedRecord>,
    pub skipped: usize,
}

impl ExportDocument {
    pub fn from_records(namespace: &str, records: &[MemoryRecord], exported_at: DateTime<Utc>) -> Self {
        let memories: Vec<ExportedMemory> = records
            .iter()
            .map(|record| ExportedMemory {
                key: record.key.clone(),
                value: record.value.to_json(),
                value_kind: Some(record.value.kind()),
                namespace: Some(record.namespace.clone()),
                metadata: record.metadata.clone(),
                updated_at: Some(format_timestamp(&record.updated_at)),
            })
            .collect();

        Self {
            namespace: namespace.to_string(),
            exported_at: format_timestamp(&exported_at),
            count: memories.len(),
            memories,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Parse an export document and turn its entries into upsertable records
///
/// A document that is not a JSON object with a `memories` array (or that
/// names no namespace when no target is given) is rejected outright.
/// Individual entries that cannot be used are skipped with a warning.
pub fn plan_import(raw: &str, target_namespace: Option<&str>) -> Result<ImportPlan> {
    let document: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| MemoryError::Validation(format!("import document is not valid JSON: {}", e)))?;

    let object = document
        .as_object()
        .ok_or_else(|| MemoryError::Validation("import document must be a JSON object".into()))?;

    let entries = object
        .get("memories")
        .and_then(|m| m.as_array())
        .ok_or_else(|| {
            MemoryError::Validation("import document has no 'memories' array".into())
        })?;

    let namespace = match target_namespace {
        Some(ns) => ns.to_string(),
        None => object
            .get("namespace")
            .and_then(|ns| ns.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                MemoryError::Validation(
                    "import document names no namespace and no target was given".into(),
                )
            })?,
    };
    validate_namespace(&namespace)?;

    let mut records = Vec::with_capacity(entries.len());
    let mut skipped = 0usize;

    for (idx, entry) in entries.iter().enumerate() {
        match prepare_entry(entry, &namespace) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!("Skipping import entry #{}: {}", idx, e);
                skipped += 1;
            }
        }
    }

    Ok(ImportPlan {
        namespace,
        records,
        skipped,
    })
}

fn prepare_entry(entry: &serde_json::Value, namespace: &str) -> Result<EncodedRecord> {
    let memory: ExportedMemory = serde_json::from_value(entry.clone())
        .map_err(|e| MemoryError::Validation(format!("malformed entry: {}", e)))?;

    validate_key(&memory.key)?;
    let value = MemoryValue::from_json(memory.value, memory.value_kind)?;
    EncodedRecord::encode(&memory.key, namespace, &value, memory.metadata.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hand_authored_document() {
        let raw = json!({
            "namespace": "notes",
            "memories": [
                {"key": "a", "value": "plain text"},
                {"key": "b", "value": {"n": 1}, "metadata": {"src": "manual"}},
                {"value": "no key"},
                {"key": "", "value": "empty key"}
            ]
        })
        .to_string();

        let plan = plan_import(&raw, None).unwrap();
        assert_eq!(plan.namespace, "notes");
        assert_eq!(plan.records.len(), 2);
        assert_eq!(plan.skipped, 2);

        assert_eq!(plan.records[0].value_kind, ValueKind::Text);
        assert_eq!(plan.records[0].metadata, None);
        assert_eq!(plan.records[1].value_kind, ValueKind::Json);
        assert_eq!(plan.records[1].value, r#"{"n":1}"#);
    }

    #[test]
    fn test_target_namespace_overrides_manifest() {
        let raw = json!({"namespace": "a", "memories": [{"key": "k", "value": 1, "namespace": "a"}]})
            .to_string();
        let plan = plan_import(&raw, Some("b")).unwrap();
        assert_eq!(plan.namespace, "b");
        assert_eq!(plan.records[0].namespace, "b");
    }

    #[test]
    fn test_malformed_documents_rejected() {
        for raw in [
            "not json",
            "[1, 2]",
            r#"{"namespace": "x"}"#,
            r#"{"namespace": "x", "memories": {}}"#,
            r#"{"memories": []}"#,
        ] {
            assert!(
                matches!(plan_import(raw, None), Err(MemoryError::Validation(_))),
                "accepted {}",
                raw
            );
        }
    }

    #[test]
    fn test_binary_values_survive_export() {
        let now = Utc::now();
        let record = MemoryRecord {
            id: 1,
            key: "blob".into(),
            namespace: "ns".into(),
            value: MemoryValue::Binary(vec![0, 255, 7]),
            metadata: None,
            created_at: now,
            updated_at: now,
            accessed_at: now,
            access_count: 0,
            embedding_ref: None,
        };

        let document = ExportDocument::from_records("ns", &[record], now);
        let raw = document.to_json_pretty().unwrap();
        let plan = plan_import(&raw, None).unwrap();

        let imported = &plan.records[0];
        assert_eq!(imported.value_kind, ValueKind::Binary);
        assert_eq!(
            MemoryValue::decode(imported.value_kind, &imported.value).unwrap(),
            MemoryValue::Binary(vec![0, 255, 7])
        );
    }
}
