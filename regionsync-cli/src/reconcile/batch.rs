//! Per-sheet reconciliation: delete stale rows, then append staged rows
//!
//! Each destination sheet is handled as a strict pipeline. Deletions are
//! issued one by one from the bottom of the sheet up, the row count is read
//! only after the last deletion has landed, and the new rows are written
//! directly below it.

use log::{debug, info};

use super::grouping::SheetBatch;
use super::ranges::{RegionRange, order_deletions, rows_removed};
use super::reference::ReferenceIndex;
use super::staged::StagedRecords;
use crate::config::ColumnLayout;
use crate::error::ReconcileError;
use crate::sheets::{CellValue, SpreadsheetStore};

/// Everything needed to reconcile one destination sheet
#[derive(Debug, Clone, PartialEq)]
pub struct SheetPlan {
    pub sheet: String,
    pub regions: Vec<String>,
    /// Ranges in application order (descending start)
    pub deletions: Vec<RegionRange>,
    /// Shaped rows to append, in staged order
    pub rows: Vec<Vec<CellValue>>,
}

/// What was done to one destination sheet
#[derive(Debug, Clone, PartialEq)]
pub struct SheetReport {
    pub sheet: String,
    pub regions: Vec<String>,
    /// Ranges deleted (or planned, on a dry run), in application order
    pub deleted: Vec<RegionRange>,
    pub rows_deleted: usize,
    pub rows_added: usize,
    /// First row the new data landed on; `None` when nothing was written
    pub appended_at: Option<usize>,
}

impl SheetPlan {
    /// Report for a plan that was not executed
    pub fn dry_report(&self) -> SheetReport {
        SheetReport {
            sheet: self.sheet.clone(),
            regions: self.regions.clone(),
            deleted: self.deletions.clone(),
            rows_deleted: rows_removed(&self.deletions),
            rows_added: self.rows.len(),
            appended_at: None,
        }
    }
}

/// Build the plan for one sheet: collect and order delete ranges, select and
/// shape the staged rows
pub fn plan_sheet(
    batch: &SheetBatch,
    reference: &ReferenceIndex,
    staged: &StagedRecords,
    layout: &ColumnLayout,
) -> Result<SheetPlan, ReconcileError> {
    let mut ranges = Vec::new();
    for region in &batch.regions {
        match reference.get(region) {
            None => debug!(
                "Region '{}' has no reference row; nothing to delete in '{}'",
                region, batch.sheet
            ),
            Some(row) => match row.delete_range() {
                Some(range) => ranges.push(RegionRange {
                    region: region.clone(),
                    range,
                }),
                None => debug!(
                    "Region '{}' has no valid row range ({}..{}) in '{}'",
                    region, row.first_index, row.last_index, batch.sheet
                ),
            },
        }
    }

    let deletions =
        order_deletions(ranges).map_err(|e| ReconcileError::batch(&batch.sheet, e.to_string()))?;

    let selected = staged.select(&batch.regions);
    let rows = staged.shape(&selected, layout);

    Ok(SheetPlan {
        sheet: batch.sheet.clone(),
        regions: batch.regions.clone(),
        deletions,
        rows,
    })
}

/// Apply a plan against the destination spreadsheet
pub async fn execute_plan(
    store: &dyn SpreadsheetStore,
    spreadsheet_id: &str,
    plan: &SheetPlan,
) -> Result<SheetReport, ReconcileError> {
    let sheet = plan.sheet.as_str();
    let fail = |what: &str, e: anyhow::Error| {
        ReconcileError::batch(sheet, format!("{}: {:#}", what, e))
    };

    // Nothing is touched unless the destination sheet exists
    let existing_rows = store
        .row_count(spreadsheet_id, sheet)
        .await
        .map_err(|e| fail("resolving sheet", e))?;

    // Delete phase: bottom-up, each call completes before the next
    for deletion in &plan.deletions {
        info!(
            "Deleting rows {} of '{}' (region {})",
            deletion.range, sheet, deletion.region
        );
        store
            .delete_rows(spreadsheet_id, sheet, deletion.range.start, deletion.range.end)
            .await
            .map_err(|e| fail(&format!("deleting rows {}", deletion.range), e))?;
    }

    // Append phase: position is taken after all deletions have landed
    let mut appended_at = None;
    if plan.rows.is_empty() {
        info!(
            "No staged rows for {} in '{}'; nothing appended",
            plan.regions.join(", "),
            sheet
        );
    } else {
        let row_count = if plan.deletions.is_empty() {
            existing_rows
        } else {
            store
                .row_count(spreadsheet_id, sheet)
                .await
                .map_err(|e| fail("reading row count", e))?
        };
        let start_row = row_count + 1;

        info!(
            "Appending {} rows to '{}' at row {}",
            plan.rows.len(),
            sheet,
            start_row
        );
        store
            .write_rows(spreadsheet_id, sheet, start_row, &plan.rows)
            .await
            .map_err(|e| fail(&format!("writing rows at {}", start_row), e))?;
        appended_at = Some(start_row);
    }

    Ok(SheetReport {
        sheet: plan.sheet.clone(),
        regions: plan.regions.clone(),
        deleted: plan.deletions.clone(),
        rows_deleted: rows_removed(&plan.deletions),
        rows_added: plan.rows.len(),
        appended_at,
    })
}
