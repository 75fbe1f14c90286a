//! Spreadsheet Store capability
//!
//! The reconciler only ever talks to a `SpreadsheetStore`: read a sheet as a
//! table, count its rows, delete a row span and write rows at a position.
//! Three back-ends implement it: an in-memory store (tests), a directory of
//! `.xlsx` workbooks (offline rehearsal) and the Google Sheets REST API.

pub mod google;
pub mod grid;
#[cfg(test)]
pub mod memory;
pub mod table;
pub mod value;
pub mod workbook;

pub use google::{GoogleSheetsStore, RetryConfig};
pub use table::{Table, canonicalize};
pub use value::CellValue;
pub use workbook::WorkbookStore;

#[cfg(test)]
pub use grid::SheetGrid;
#[cfg(test)]
pub use memory::{MemoryStore, StoreOp};

use anyhow::Result;
use async_trait::async_trait;

/// Which sheet of a spreadsheet to read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelector {
    /// The first tab (staging uploads always land there)
    First,
    /// A tab by exact name
    Named(String),
}

impl std::fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetSelector::First => write!(f, "<first sheet>"),
            SheetSelector::Named(name) => write!(f, "{}", name),
        }
    }
}

/// Tabular-data store holding the staging and destination spreadsheets
///
/// Calls are issued one at a time by the reconciler; implementations need no
/// internal ordering guarantees beyond completing a call before returning.
#[async_trait]
pub trait SpreadsheetStore: Send + Sync {
    /// Short back-end name for logs
    fn backend_name(&self) -> &'static str;

    /// Read a sheet as a header-keyed table
    async fn read_table(&self, spreadsheet_id: &str, sheet: &SheetSelector) -> Result<Table>;

    /// Number of populated rows in a sheet, header included
    async fn row_count(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<usize>;

    /// Delete rows `start..=end` (1-based, inclusive)
    async fn delete_rows(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        start: usize,
        end: usize,
    ) -> Result<()>;

    /// Write `rows` beginning at `start_row` (1-based), no header
    async fn write_rows(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        start_row: usize,
        rows: &[Vec<CellValue>],
    ) -> Result<()>;
}
