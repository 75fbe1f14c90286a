//! Reference table: where each region's rows currently live

use std::collections::HashMap;

use log::{debug, warn};

use super::ranges::DeleteRange;
use crate::error::ReconcileError;
use crate::sheets::{CellValue, SheetSelector, SpreadsheetStore, Table, canonicalize};

pub const REGIONS_COLUMN: &str = "REGIONS";
pub const FIRST_INDEX_COLUMN: &str = "TARGET FIRST INDEX";
pub const LAST_INDEX_COLUMN: &str = "TARGET LAST INDEX";

/// Current extent of a region's rows in its destination sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceRow {
    pub first_index: i64,
    pub last_index: i64,
}

impl ReferenceRow {
    pub fn delete_range(&self) -> Option<DeleteRange> {
        DeleteRange::new(self.first_index, self.last_index)
    }
}

/// Region -> ReferenceRow lookup, read fresh once per run
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    rows: HashMap<String, ReferenceRow>,
}

impl ReferenceIndex {
    /// Read the reference sheet from the destination spreadsheet
    pub async fn load(
        store: &dyn SpreadsheetStore,
        spreadsheet_id: &str,
        sheet_name: &str,
    ) -> Result<Self, ReconcileError> {
        let table = store
            .read_table(spreadsheet_id, &SheetSelector::Named(sheet_name.to_string()))
            .await
            .map_err(|e| ReconcileError::ReferenceTableUnavailable {
                sheet: sheet_name.to_string(),
                reason: format!("{:#}", e),
            })?;
        Self::from_table(&table, sheet_name)
    }

    /// Build the index from an already-read table
    pub fn from_table(table: &Table, sheet_name: &str) -> Result<Self, ReconcileError> {
        let region_col = table.column_index(REGIONS_COLUMN).ok_or_else(|| {
            ReconcileError::ReferenceTableUnavailable {
                sheet: sheet_name.to_string(),
                reason: format!("missing '{}' column", REGIONS_COLUMN),
            }
        })?;
        let first_col = table.column_index(FIRST_INDEX_COLUMN);
        let last_col = table.column_index(LAST_INDEX_COLUMN);
        if first_col.is_none() || last_col.is_none() {
            warn!(
                "Reference sheet '{}' lacks '{}' or '{}'; no rows will be deleted",
                sheet_name, FIRST_INDEX_COLUMN, LAST_INDEX_COLUMN
            );
        }

        let mut rows = HashMap::new();
        for row in table.rows() {
            let region = canonicalize(&row[region_col].to_string());
            if region.is_empty() {
                continue;
            }

            if rows.contains_key(&region) {
                warn!(
                    "Region '{}' is listed more than once in '{}'; keeping the first entry",
                    region, sheet_name
                );
                continue;
            }

            let first_index = read_index(row, first_col, &region, FIRST_INDEX_COLUMN);
            let last_index = read_index(row, last_col, &region, LAST_INDEX_COLUMN);
            rows.insert(
                region,
                ReferenceRow {
                    first_index,
                    last_index,
                },
            );
        }

        debug!("Reference sheet '{}' lists {} regions", sheet_name, rows.len());
        Ok(Self { rows })
    }

    /// Reference row for a canonical region; absent means "no existing rows"
    pub fn get(&self, region: &str) -> Option<&ReferenceRow> {
        self.rows.get(region)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

}

fn read_index(row: &[CellValue], col: Option<usize>, region: &str, column: &str) -> i64 {
    let Some(cell) = col.and_then(|c| row.get(c)) else {
        return 0;
    };
    cell.as_row_index().unwrap_or_else(|| {
        warn!(
            "Region '{}' has a non-numeric '{}' value '{}'; treating it as 0",
            region, column, cell
        );
        0
    })
}
