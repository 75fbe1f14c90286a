//! Staged (freshly uploaded) records

use crate::config::ColumnLayout;
use crate::error::ReconcileError;
use crate::sheets::{CellValue, SheetSelector, SpreadsheetStore, Table, canonicalize};

use super::reference::REGIONS_COLUMN;

/// The uploaded table, read once per run from the staging spreadsheet
#[derive(Debug, Clone)]
pub struct StagedRecords {
    table: Table,
    /// Canonical region of each row, parallel to `table.rows()`
    row_regions: Vec<String>,
}

impl StagedRecords {
    /// Read the first sheet of the staging spreadsheet
    pub async fn load(
        store: &dyn SpreadsheetStore,
        spreadsheet_id: &str,
    ) -> Result<Self, ReconcileError> {
        let table = store
            .read_table(spreadsheet_id, &SheetSelector::First)
            .await
            .map_err(|e| ReconcileError::StagingTableUnavailable {
                spreadsheet_id: spreadsheet_id.to_string(),
                reason: format!("{:#}", e),
            })?;
        Self::from_table(table, spreadsheet_id)
    }

    pub fn from_table(table: Table, spreadsheet_id: &str) -> Result<Self, ReconcileError> {
        let region_col = table.column_index(REGIONS_COLUMN).ok_or_else(|| {
            ReconcileError::StagingTableUnavailable {
                spreadsheet_id: spreadsheet_id.to_string(),
                reason: format!("missing '{}' column", REGIONS_COLUMN),
            }
        })?;
        let row_regions = table
            .rows()
            .iter()
            .map(|row| canonicalize(&row[region_col].to_string()))
            .collect();

        Ok(Self { table, row_regions })
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn headers(&self) -> &[String] {
        self.table.headers()
    }

    /// Rows whose region is one of `regions`, in staged order
    pub fn select(&self, regions: &[String]) -> Vec<&[CellValue]> {
        self.table
            .rows()
            .iter()
            .zip(&self.row_regions)
            .filter(|(_, region)| regions.contains(region))
            .map(|(row, _)| row.as_slice())
            .collect()
    }

    /// Reshape selected rows to the configured column layout
    pub fn shape(&self, rows: &[&[CellValue]], layout: &ColumnLayout) -> Vec<Vec<CellValue>> {
        match layout {
            ColumnLayout::Passthrough => rows.iter().map(|row| row.to_vec()).collect(),
            ColumnLayout::Fixed(columns) => {
                let sources: Vec<Option<usize>> = columns
                    .iter()
                    .map(|name| self.table.column_index(name))
                    .collect();
                rows.iter()
                    .map(|row| {
                        sources
                            .iter()
                            .map(|src| {
                                src.and_then(|idx| row.get(idx).cloned())
                                    .unwrap_or_default()
                            })
                            .collect()
                    })
                    .collect()
            }
        }
    }

    /// Columns of a fixed layout that the staged table does not provide
    pub fn missing_columns<'a>(&self, layout: &'a ColumnLayout) -> Vec<&'a str> {
        match layout {
            ColumnLayout::Passthrough => Vec::new(),
            ColumnLayout::Fixed(columns) => columns
                .iter()
                .filter(|name| self.table.column_index(name).is_none())
                .map(String::as_str)
                .collect(),
        }
    }
}
