//! Spreadsheet store over a directory of `.xlsx` workbooks
//!
//! Spreadsheet id `X` maps to `<dir>/X.xlsx`. Workbooks are read with
//! calamine on first use and written back whole with rust_xlsxwriter after
//! every mutation, so the files on disk always reflect the last completed call.
//! A mutation whose save fails leaves both the file and the cache untouched.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use calamine::{Data, Reader, Xlsx, open_workbook};
use log::debug;
use rust_xlsxwriter::{Workbook, Worksheet};

use super::grid::{SheetGrid, WorkbookGrid};
use super::table::Table;
use super::value::CellValue;
use super::{SheetSelector, SpreadsheetStore};

/// Store reading and writing local workbook files
#[derive(Debug)]
pub struct WorkbookStore {
    dir: PathBuf,
    books: Mutex<HashMap<String, WorkbookGrid>>,
}

impl WorkbookStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            anyhow::bail!("Workbook directory does not exist: {}", dir.display());
        }
        Ok(Self {
            dir,
            books: Mutex::new(HashMap::new()),
        })
    }

    fn path_for(&self, spreadsheet_id: &str) -> PathBuf {
        self.dir.join(format!("{}.xlsx", spreadsheet_id))
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, WorkbookGrid>> {
        self.books.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `f` against a loaded workbook, loading it from disk if needed
    fn with_book<T>(
        &self,
        spreadsheet_id: &str,
        f: impl FnOnce(&mut WorkbookGrid) -> Result<T>,
    ) -> Result<T> {
        let mut books = self.lock();
        if !books.contains_key(spreadsheet_id) {
            let book = read_workbook(&self.path_for(spreadsheet_id))?;
            books.insert(spreadsheet_id.to_string(), book);
        }
        let book = books
            .get_mut(spreadsheet_id)
            .ok_or_else(|| anyhow!("Spreadsheet not loaded: {}", spreadsheet_id))?;
        f(book)
    }

    fn mutate(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        f: impl FnOnce(&mut SheetGrid) -> Result<()>,
    ) -> Result<()> {
        let path = self.path_for(spreadsheet_id);
        self.with_book(spreadsheet_id, |book| {
            // The cached copy only changes once the file is saved
            let mut edited = book.clone();
            let sheet = edited
                .sheet_mut(sheet_name)
                .ok_or_else(|| anyhow!("Worksheet not found: {}", sheet_name))?;
            f(sheet)?;
            write_workbook(&edited, &path)?;
            *book = edited;
            Ok(())
        })
    }
}

#[async_trait]
impl SpreadsheetStore for WorkbookStore {
    fn backend_name(&self) -> &'static str {
        "workbook"
    }

    async fn read_table(&self, spreadsheet_id: &str, sheet: &SheetSelector) -> Result<Table> {
        self.with_book(spreadsheet_id, |book| {
            book.select(sheet)
                .map(SheetGrid::to_table)
                .with_context(|| format!("Worksheet not found: {}", sheet))
        })
    }

    async fn row_count(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<usize> {
        self.with_book(spreadsheet_id, |book| {
            book.sheet(sheet_name)
                .map(SheetGrid::row_count)
                .with_context(|| format!("Worksheet not found: {}", sheet_name))
        })
    }

    async fn delete_rows(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        start: usize,
        end: usize,
    ) -> Result<()> {
        self.mutate(spreadsheet_id, sheet_name, |sheet| sheet.delete_rows(start, end))
    }

    async fn write_rows(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        start_row: usize,
        rows: &[Vec<CellValue>],
    ) -> Result<()> {
        self.mutate(spreadsheet_id, sheet_name, |sheet| {
            sheet.write_rows(start_row, rows)
        })
    }
}

/// Read every sheet of an `.xlsx` file, keeping absolute row/column positions
pub fn read_workbook(path: &Path) -> Result<WorkbookGrid> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .with_context(|| format!("Failed to open Excel file: {}", path.display()))?;

    let mut sheets = Vec::new();
    for sheet_name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&sheet_name)
            .with_context(|| format!("Failed to read sheet: {}", sheet_name))?;

        // calamine ranges start at the first used cell, not at A1
        let (row_offset, col_offset) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));

        let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); row_offset];
        for row in range.rows() {
            let mut cells = vec![CellValue::Empty; col_offset];
            cells.extend(row.iter().map(cell_to_value));
            rows.push(cells);
        }

        debug!("Loaded sheet '{}' with {} rows", sheet_name, rows.len());
        sheets.push(SheetGrid::new(sheet_name, rows));
    }

    Ok(WorkbookGrid::new(sheets))
}

/// Write every sheet of a workbook grid to an `.xlsx` file
pub fn write_workbook(book: &WorkbookGrid, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();

    for sheet in &book.sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;

        for (row_idx, row) in sheet.rows.iter().enumerate() {
            for (col_idx, value) in row.iter().enumerate() {
                write_value(worksheet, row_idx as u32, col_idx as u16, value)?;
            }
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to save Excel file: {}", path.display()))?;

    Ok(())
}

fn cell_to_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::text(s.clone()),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::Float(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}

fn write_value(ws: &mut Worksheet, row: u32, col: u16, value: &CellValue) -> Result<()> {
    match value {
        CellValue::Empty => { /* Leave cell empty */ }
        CellValue::Text(s) => { ws.write_string(row, col, s)?; }
        CellValue::Int(i) => { ws.write_number(row, col, *i as f64)?; }
        CellValue::Float(f) => { ws.write_number(row, col, *f)?; }
        CellValue::Bool(b) => { ws.write_boolean(row, col, *b)?; }
    }
    Ok(())
}
