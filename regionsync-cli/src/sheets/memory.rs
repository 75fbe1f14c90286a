//! In-process spreadsheet store
//!
//! Holds spreadsheets as `WorkbookGrid`s and records every mutating call so
//! callers can assert on the exact order of deletions and writes.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;

use super::grid::{SheetGrid, WorkbookGrid};
use super::table::Table;
use super::value::CellValue;
use super::{SheetSelector, SpreadsheetStore};

/// A mutating call observed by the memory store
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    Delete {
        sheet: String,
        start: usize,
        end: usize,
    },
    Write {
        sheet: String,
        start_row: usize,
        rows: usize,
    },
}

#[derive(Debug, Default)]
struct MemoryState {
    books: HashMap<String, WorkbookGrid>,
    ops: Vec<StoreOp>,
    failing_sheets: HashSet<String>,
}

/// Spreadsheet store backed by process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a spreadsheet
    pub fn insert_spreadsheet(&self, spreadsheet_id: impl Into<String>, sheets: Vec<SheetGrid>) {
        self.lock()
            .books
            .insert(spreadsheet_id.into(), WorkbookGrid::new(sheets));
    }

    /// Make every mutating call against `sheet_name` fail
    pub fn fail_writes_to(&self, sheet_name: impl Into<String>) {
        self.lock().failing_sheets.insert(sheet_name.into());
    }

    /// Mutating calls observed so far, in order
    pub fn operations(&self) -> Vec<StoreOp> {
        self.lock().ops.clone()
    }

    /// Snapshot of a sheet's rows
    pub fn sheet_rows(&self, spreadsheet_id: &str, sheet_name: &str) -> Option<Vec<Vec<CellValue>>> {
        self.lock()
            .books
            .get(spreadsheet_id)
            .and_then(|book| book.sheet(sheet_name))
            .map(|sheet| sheet.rows[..sheet.row_count()].to_vec())
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A poisoned lock only means a test thread panicked mid-call
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl MemoryState {
    fn sheet_mut(&mut self, spreadsheet_id: &str, sheet_name: &str) -> Result<&mut SheetGrid> {
        if self.failing_sheets.contains(sheet_name) {
            bail!("Simulated store failure for sheet '{}'", sheet_name);
        }
        self.books
            .get_mut(spreadsheet_id)
            .ok_or_else(|| anyhow!("Spreadsheet not found: {}", spreadsheet_id))?
            .sheet_mut(sheet_name)
            .ok_or_else(|| anyhow!("Worksheet not found: {}", sheet_name))
    }
}

#[async_trait]
impl SpreadsheetStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn read_table(&self, spreadsheet_id: &str, sheet: &SheetSelector) -> Result<Table> {
        let state = self.lock();
        let book = state
            .books
            .get(spreadsheet_id)
            .ok_or_else(|| anyhow!("Spreadsheet not found: {}", spreadsheet_id))?;
        let grid = book
            .select(sheet)
            .with_context(|| format!("Worksheet not found: {}", sheet))?;
        Ok(grid.to_table())
    }

    async fn row_count(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<usize> {
        let state = self.lock();
        state
            .books
            .get(spreadsheet_id)
            .and_then(|book| book.sheet(sheet_name))
            .map(SheetGrid::row_count)
            .ok_or_else(|| anyhow!("Worksheet not found: {}", sheet_name))
    }

    async fn delete_rows(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        start: usize,
        end: usize,
    ) -> Result<()> {
        let mut state = self.lock();
        state.sheet_mut(spreadsheet_id, sheet_name)?.delete_rows(start, end)?;
        state.ops.push(StoreOp::Delete {
            sheet: sheet_name.to_string(),
            start,
            end,
        });
        Ok(())
    }

    async fn write_rows(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        start_row: usize,
        rows: &[Vec<CellValue>],
    ) -> Result<()> {
        let mut state = self.lock();
        state
            .sheet_mut(spreadsheet_id, sheet_name)?
            .write_rows(start_row, rows)?;
        state.ops.push(StoreOp::Write {
            sheet: sheet_name.to_string(),
            start_row,
            rows: rows.len(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_spreadsheet(
            "main",
            vec![SheetGrid::new(
                "Alpha",
                vec![
                    vec![CellValue::from("REGIONS")],
                    vec![CellValue::from("ALPHA 1")],
                    vec![CellValue::from("ALPHA 2")],
                ],
            )],
        );
        store
    }

    #[tokio::test]
    async fn test_records_operations_in_order() {
        let store = store();
        store.delete_rows("main", "Alpha", 2, 2).await.unwrap();
        store
            .write_rows("main", "Alpha", 3, &[vec![CellValue::from("ALPHA 1")]])
            .await
            .unwrap();

        assert_eq!(
            store.operations(),
            vec![
                StoreOp::Delete {
                    sheet: "Alpha".into(),
                    start: 2,
                    end: 2
                },
                StoreOp::Write {
                    sheet: "Alpha".into(),
                    start_row: 3,
                    rows: 1
                },
            ]
        );
        assert_eq!(store.row_count("main", "Alpha").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = store();
        store.fail_writes_to("Alpha");
        assert!(store.delete_rows("main", "Alpha", 2, 2).await.is_err());
        assert!(store.operations().is_empty());
        // Reads still succeed
        assert_eq!(store.row_count("main", "Alpha").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_missing_sheet() {
        let store = store();
        let err = store
            .read_table("main", &SheetSelector::Named("Reference".into()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Reference"));
    }
}
