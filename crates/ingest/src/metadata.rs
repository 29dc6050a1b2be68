//! Id and metadata normalization.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::{IdStrategy, IngestConfig};
use crate::error::IngestError;

/// Sanitizes an optional string by stripping control characters (when
/// `strip_control` is set) and trimming whitespace. Empty results become
/// `None`.
pub(crate) fn sanitize_optional_string(
    value: Option<String>,
    strip_control: bool,
) -> Option<String> {
    value.and_then(|raw| {
        let filtered = if strip_control {
            raw.chars().filter(|c| !c.is_control()).collect::<String>()
        } else {
            raw
        };
        let trimmed = filtered.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

/// Validates a caller-supplied id. A supplied-but-blank id is an error, not
/// a request for a generated one.
pub(crate) fn sanitize_id(id: String, cfg: &IngestConfig) -> Result<String, IngestError> {
    let id = sanitize_optional_string(Some(id), cfg.strip_control_chars)
        .ok_or_else(|| IngestError::InvalidId("id empty".into()))?;
    if id.len() > cfg.max_id_len {
        return Err(IngestError::InvalidId(format!(
            "id length {} exceeds limit of {}",
            id.len(),
            cfg.max_id_len
        )));
    }
    Ok(id)
}

/// Generates an id for an anonymous input.
pub(crate) fn generate_id(cfg: &IngestConfig, bytes: &[u8]) -> String {
    match cfg.id_strategy {
        IdStrategy::Random => Uuid::new_v4().to_string(),
        IdStrategy::ContentDerived => Uuid::new_v5(&cfg.id_namespace, bytes).to_string(),
    }
}

/// Normalizes metadata to a JSON object and enforces the size limit.
pub(crate) fn normalize_metadata(
    metadata: Value,
    cfg: &IngestConfig,
) -> Result<Value, IngestError> {
    let metadata = match metadata {
        Value::Null => Value::Object(Map::new()),
        obj @ Value::Object(_) => obj,
        other => {
            return Err(IngestError::InvalidMetadata(format!(
                "metadata must be a JSON object, got {}",
                json_type_name(&other)
            )))
        }
    };
    enforce_metadata_limit(&metadata, cfg.max_metadata_bytes)?;
    Ok(metadata)
}

fn enforce_metadata_limit(metadata: &Value, limit: Option<usize>) -> Result<(), IngestError> {
    if let Some(limit) = limit {
        let serialized = serde_json::to_vec(metadata).map_err(|err| {
            IngestError::InvalidMetadata(format!("metadata serialization failed: {err}"))
        })?;
        if serialized.len() > limit {
            return Err(IngestError::InvalidMetadata(format!(
                "metadata exceeds {limit} bytes (got {})",
                serialized.len()
            )));
        }
    }
    Ok(())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
