//! Input resolution
//!
//! Turns whichever trigger started the job into `JobParams`: an HTTP-style
//! JSON body, environment variables (CI / scheduled runs) or explicit CLI
//! flags.

pub mod env;
pub mod payload;

use env::{from_env, parse_region_list};
use payload::from_payload;

use crate::error::ReconcileError;

/// Parameters of one reconciliation job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobParams {
    /// Spreadsheet holding the freshly uploaded rows (first sheet)
    pub staging_id: String,
    /// Spreadsheet holding the destination sheets and the reference sheet
    pub destination_id: String,
    /// Selected region names as supplied (not yet canonicalized)
    pub regions: Vec<String>,
}

/// Where the job parameters come from
#[derive(Debug, Clone)]
pub enum TriggerSource {
    /// JSON body `{tempSheetId, mainSheetId, regions}`
    Payload(String),
    /// Process environment
    Environment,
    /// Explicit command-line values
    Flags {
        staging_id: Option<String>,
        destination_id: Option<String>,
        regions: Vec<String>,
    },
}

impl TriggerSource {
    pub fn describe(&self) -> &'static str {
        match self {
            TriggerSource::Payload(_) => "payload",
            TriggerSource::Environment => "environment",
            TriggerSource::Flags { .. } => "flags",
        }
    }
}

/// Resolve job parameters from a trigger source
pub fn resolve(source: &TriggerSource) -> Result<JobParams, ReconcileError> {
    match source {
        TriggerSource::Payload(body) => from_payload(body),
        TriggerSource::Environment => from_env(|key| std::env::var(key).ok()),
        TriggerSource::Flags {
            staging_id,
            destination_id,
            regions,
        } => from_flags(staging_id.as_deref(), destination_id.as_deref(), regions),
    }
}

/// Resolve from CLI flags; every field is required once flags are in use
pub fn from_flags(
    staging_id: Option<&str>,
    destination_id: Option<&str>,
    regions: &[String],
) -> Result<JobParams, ReconcileError> {
    let staging_id = required(staging_id, "--temp-sheet-id")?;
    let destination_id = required(destination_id, "--main-sheet-id")?;
    if regions.is_empty() {
        return Err(ReconcileError::missing("--region"));
    }

    let mut selected = Vec::new();
    for value in regions {
        selected.extend(parse_region_list("--region", value)?);
    }

    Ok(JobParams {
        staging_id,
        destination_id,
        regions: selected,
    })
}

pub(crate) fn required(value: Option<&str>, name: &str) -> Result<String, ReconcileError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ReconcileError::missing(name))
}
