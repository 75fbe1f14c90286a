//! Environment-variable trigger (scheduled and CI runs)

use serde_json::Value;

use super::{JobParams, required};
use crate::error::ReconcileError;

pub const TEMP_SHEET_ID: &str = "TEMP_SHEET_ID";
pub const MAIN_SHEET_ID: &str = "MAIN_SHEET_ID";
pub const SELECTED_REGION: &str = "SELECTED_REGION";
pub const SELECTED_REGIONS: &str = "SELECTED_REGIONS";
pub const SELECTED_REGIONS_JSON: &str = "SELECTED_REGIONS_JSON";

/// Resolve parameters through `lookup` (usually `std::env::var`)
///
/// Region variables are consulted in order `SELECTED_REGIONS_JSON`,
/// `SELECTED_REGIONS`, `SELECTED_REGION`; the first non-empty one wins.
pub fn from_env(lookup: impl Fn(&str) -> Option<String>) -> Result<JobParams, ReconcileError> {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let staging_id = required(get(TEMP_SHEET_ID).as_deref(), TEMP_SHEET_ID)?;
    let destination_id = required(get(MAIN_SHEET_ID).as_deref(), MAIN_SHEET_ID)?;

    let regions = if let Some(json) = get(SELECTED_REGIONS_JSON) {
        parse_region_json(SELECTED_REGIONS_JSON, &json)?
    } else if let Some(list) = get(SELECTED_REGIONS) {
        parse_region_list(SELECTED_REGIONS, &list)?
    } else if let Some(single) = get(SELECTED_REGION) {
        vec![single.trim().to_string()]
    } else {
        return Err(ReconcileError::missing(format!(
            "{} | {} | {}",
            SELECTED_REGIONS_JSON, SELECTED_REGIONS, SELECTED_REGION
        )));
    };

    Ok(JobParams {
        staging_id,
        destination_id,
        regions,
    })
}

/// Split a comma-delimited region list, dropping blank entries
pub fn parse_region_list(name: &str, raw: &str) -> Result<Vec<String>, ReconcileError> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        return Err(ReconcileError::malformed(
            name,
            format!(
                "looks like a JSON array; use {} for JSON-encoded lists",
                SELECTED_REGIONS_JSON
            ),
        ));
    }

    let regions: Vec<String> = trimmed
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect();

    if regions.is_empty() {
        return Err(ReconcileError::malformed(
            name,
            format!("no region names in '{}'", raw),
        ));
    }
    Ok(regions)
}

/// Parse a JSON array of region names
pub fn parse_region_json(name: &str, raw: &str) -> Result<Vec<String>, ReconcileError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| ReconcileError::malformed(name, format!("invalid JSON: {}", e)))?;

    let items = value
        .as_array()
        .ok_or_else(|| ReconcileError::malformed(name, "expected a JSON array of strings"))?;

    items
        .iter()
        .map(|item| {
            item.as_str().map(|s| s.trim().to_string()).ok_or_else(|| {
                ReconcileError::malformed(name, format!("non-string entry {}", item))
            })
        })
        .collect()
}
