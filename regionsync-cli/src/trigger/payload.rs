//! HTTP-style JSON trigger body

use serde_json::Value;

use super::{JobParams, required};
use crate::error::ReconcileError;

/// Parse `{"tempSheetId": ..., "mainSheetId": ..., "regions": [...]}`
pub fn from_payload(body: &str) -> Result<JobParams, ReconcileError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ReconcileError::malformed("payload", format!("invalid JSON: {}", e)))?;

    let object = value
        .as_object()
        .ok_or_else(|| ReconcileError::malformed("payload", "expected a JSON object"))?;

    let staging_id = string_field(object.get("tempSheetId"), "tempSheetId")?;
    let destination_id = string_field(object.get("mainSheetId"), "mainSheetId")?;

    let regions = match object.get("regions") {
        None | Some(Value::Null) => return Err(ReconcileError::missing("regions")),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    ReconcileError::malformed(
                        "regions",
                        format!("entry {} is not a string: {}", idx, item),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => {
            return Err(ReconcileError::malformed(
                "regions",
                format!("expected an array of strings, got {}", other),
            ));
        }
    };

    Ok(JobParams {
        staging_id,
        destination_id,
        regions,
    })
}

fn string_field(value: Option<&Value>, name: &str) -> Result<String, ReconcileError> {
    match value {
        None | Some(Value::Null) => Err(ReconcileError::missing(name)),
        Some(Value::String(s)) => required(Some(s.as_str()), name),
        Some(other) => Err(ReconcileError::malformed(
            name,
            format!("expected a string, got {}", other),
        )),
    }
}
