//! Run result aggregation

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::batch::SheetReport;
use crate::error::ReconcileError;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_PARTIAL_FAILURE: i32 = 1;
pub const EXIT_HARD_FAILURE: i32 = 2;

/// A destination sheet whose batch failed
#[derive(Debug, Clone, PartialEq)]
pub struct SheetFailure {
    pub sheet: String,
    pub regions: Vec<String>,
    pub error: ReconcileError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every batch succeeded
    Success,
    /// At least one sheet failed (batch-isolated mode only)
    PartialFailure,
}

/// Tally of one run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub dry_run: bool,
    pub sheets: Vec<SheetReport>,
    pub failed: Vec<SheetFailure>,
    pub skipped_regions: Vec<String>,
}

/// JSON body mirroring the HTTP trigger's response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    pub added: usize,
    pub sheets: usize,
    pub failed_sheets: Vec<String>,
    pub skipped_regions: Vec<String>,
    pub run_id: String,
}

impl RunSummary {
    pub fn new(run_id: Uuid, dry_run: bool) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            finished_at: None,
            dry_run,
            sheets: Vec::new(),
            failed: Vec::new(),
            skipped_regions: Vec::new(),
        }
    }

    pub fn record_success(&mut self, report: SheetReport) {
        self.sheets.push(report);
    }

    pub fn record_failure(&mut self, sheet: &str, regions: &[String], error: ReconcileError) {
        self.failed.push(SheetFailure {
            sheet: sheet.to_string(),
            regions: regions.to_vec(),
            error,
        });
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn total_added(&self) -> usize {
        self.sheets.iter().map(|s| s.rows_added).sum()
    }

    pub fn total_deleted(&self) -> usize {
        self.sheets.iter().map(|s| s.rows_deleted).sum()
    }

    pub fn outcome(&self) -> RunOutcome {
        if self.failed.is_empty() {
            RunOutcome::Success
        } else {
            RunOutcome::PartialFailure
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.outcome() {
            RunOutcome::Success => EXIT_SUCCESS,
            RunOutcome::PartialFailure => EXIT_PARTIAL_FAILURE,
        }
    }

    pub fn message(&self) -> String {
        let added = self.total_added();
        let sheets = self.sheets.len();

        if self.dry_run {
            return format!(
                "Dry run complete. Would add {} record(s) across {} sheet(s).",
                added, sheets
            );
        }

        match self.outcome() {
            RunOutcome::Success => format!(
                "Reconciliation complete. Added {} record(s) across {} sheet(s).",
                added, sheets
            ),
            RunOutcome::PartialFailure => {
                let failed: Vec<String> = self
                    .failed
                    .iter()
                    .map(|f| format!("{} ({})", f.sheet, f.error))
                    .collect();
                format!(
                    "Reconciliation finished with errors. Added {} record(s) across {} sheet(s); {} sheet(s) failed: {}",
                    added,
                    sheets,
                    self.failed.len(),
                    failed.join("; ")
                )
            }
        }
    }

    pub fn to_response(&self) -> Response {
        Response {
            status: match self.outcome() {
                RunOutcome::Success => "success",
                RunOutcome::PartialFailure => "error",
            },
            message: self.message(),
            kind: None,
            added: self.total_added(),
            sheets: self.sheets.len(),
            failed_sheets: self.failed.iter().map(|f| f.sheet.clone()).collect(),
            skipped_regions: self.skipped_regions.clone(),
            run_id: self.run_id.to_string(),
        }
    }
}

impl Response {
    /// Error body carrying only a message
    pub fn error(run_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
            kind: None,
            added: 0,
            sheets: 0,
            failed_sheets: Vec::new(),
            skipped_regions: Vec::new(),
            run_id: run_id.to_string(),
        }
    }
}

/// Response for a run that aborted before or during batch processing
pub fn hard_failure_response(run_id: Uuid, error: &ReconcileError) -> Response {
    let mut response = Response::error(run_id, error.to_string());
    response.kind = Some(error.kind());
    if let ReconcileError::BatchProcessing { sheet, .. } = error {
        response.failed_sheets.push(sheet.clone());
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(sheet: &str, added: usize) -> SheetReport {
        SheetReport {
            sheet: sheet.to_string(),
            regions: vec![sheet.to_uppercase()],
            deleted: Vec::new(),
            rows_deleted: 0,
            rows_added: added,
            appended_at: Some(2),
        }
    }

    #[test]
    fn test_success_summary() {
        let mut summary = RunSummary::new(Uuid::new_v4(), false);
        summary.record_success(report("Alpha", 2));
        summary.record_success(report("Bayelsa", 1));
        let summary = summary.finish();

        assert_eq!(summary.outcome(), RunOutcome::Success);
        assert_eq!(summary.exit_code(), 0);
        assert_eq!(
            summary.message(),
            "Reconciliation complete. Added 3 record(s) across 2 sheet(s)."
        );
        let response = summary.to_response();
        assert_eq!(response.status, "success");
        assert_eq!(response.added, 3);
        assert!(summary.finished_at.is_some());
    }

    #[test]
    fn test_partial_failure_summary() {
        let mut summary = RunSummary::new(Uuid::new_v4(), false);
        summary.record_success(report("Bayelsa", 1));
        summary.record_failure(
            "Alpha",
            &["ALPHA 1".to_string()],
            ReconcileError::batch("Alpha", "quota exceeded"),
        );

        assert_eq!(summary.outcome(), RunOutcome::PartialFailure);
        assert_ne!(summary.exit_code(), 0);
        assert!(summary.message().contains("1 sheet(s) failed"));
        assert!(summary.message().contains("quota exceeded"));

        let json = serde_json::to_value(summary.to_response()).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["failedSheets"], serde_json::json!(["Alpha"]));
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn test_hard_failure_response() {
        let err = ReconcileError::UnmappedRegion {
            region: "Atlantis".into(),
        };
        let json = serde_json::to_value(hard_failure_response(Uuid::nil(), &err)).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["kind"], "unmapped_region");
        assert_eq!(json["message"], "No sheet mapping found for region 'Atlantis'");
    }

    #[test]
    fn test_dry_run_message() {
        let mut summary = RunSummary::new(Uuid::new_v4(), true);
        summary.record_success(report("Alpha", 4));
        assert!(summary.message().starts_with("Dry run complete. Would add 4"));
    }
}
