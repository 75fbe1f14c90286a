//! Error taxonomy for a reconciliation run
//!
//! Every variant except `BatchProcessing` is fatal and aborts the run before
//! any sheet is touched. `BatchProcessing` is scoped to one destination sheet
//! and only aborts the run when the batch error policy says so.

/// Errors surfaced to the trigger boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// No usable authenticated session with the spreadsheet store
    Authentication { reason: String },
    /// A required trigger parameter is absent
    MissingParameter { name: String },
    /// A trigger parameter is present but cannot be parsed
    MalformedInput { name: String, reason: String },
    /// A selected region has no destination sheet (strict mode only)
    UnmappedRegion { region: String },
    /// The staged table cannot be read or lacks a REGIONS column
    StagingTableUnavailable { spreadsheet_id: String, reason: String },
    /// The reference table cannot be read or lacks a REGIONS column
    ReferenceTableUnavailable { sheet: String, reason: String },
    /// One destination sheet's batch failed
    BatchProcessing { sheet: String, reason: String },
}

impl ReconcileError {
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingParameter { name: name.into() }
    }

    pub fn malformed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn batch(sheet: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BatchProcessing {
            sheet: sheet.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-friendly kind, used in JSON output
    pub fn kind(&self) -> &'static str {
        match self {
            ReconcileError::Authentication { .. } => "authentication",
            ReconcileError::MissingParameter { .. } => "missing_parameter",
            ReconcileError::MalformedInput { .. } => "malformed_input",
            ReconcileError::UnmappedRegion { .. } => "unmapped_region",
            ReconcileError::StagingTableUnavailable { .. } => "staging_table_unavailable",
            ReconcileError::ReferenceTableUnavailable { .. } => "reference_table_unavailable",
            ReconcileError::BatchProcessing { .. } => "batch_processing",
        }
    }
}

impl std::fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcileError::Authentication { reason } => {
                write!(f, "Authentication with the spreadsheet store failed: {}", reason)
            }
            ReconcileError::MissingParameter { name } => {
                write!(f, "Missing required parameter '{}'", name)
            }
            ReconcileError::MalformedInput { name, reason } => {
                write!(f, "Malformed value for '{}': {}", name, reason)
            }
            ReconcileError::UnmappedRegion { region } => {
                write!(f, "No sheet mapping found for region '{}'", region)
            }
            ReconcileError::StagingTableUnavailable {
                spreadsheet_id,
                reason,
            } => {
                write!(
                    f,
                    "Staging table in spreadsheet '{}' is unavailable: {}",
                    spreadsheet_id, reason
                )
            }
            ReconcileError::ReferenceTableUnavailable { sheet, reason } => {
                write!(f, "Reference sheet '{}' is unavailable: {}", sheet, reason)
            }
            ReconcileError::BatchProcessing { sheet, reason } => {
                write!(f, "Processing sheet '{}' failed: {}", sheet, reason)
            }
        }
    }
}

impl std::error::Error for ReconcileError {}
