//! In-memory sheet grids used by the memory and workbook stores

use anyhow::{Result, bail};

use super::SheetSelector;
use super::table::Table;
use super::value::CellValue;

/// A named sheet holding rows of cells (row 0 is spreadsheet row 1)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetGrid {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
}

impl SheetGrid {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Number of rows up to and including the last non-blank row
    pub fn row_count(&self) -> usize {
        self.rows
            .iter()
            .rposition(|row| row.iter().any(|cell| !cell.is_empty()))
            .map(|idx| idx + 1)
            .unwrap_or(0)
    }

    /// Delete rows `start..=end` (1-based, inclusive), shifting rows below up
    pub fn delete_rows(&mut self, start: usize, end: usize) -> Result<()> {
        if start == 0 || end < start {
            bail!(
                "Invalid row range {}..{} for sheet '{}'",
                start,
                end,
                self.name
            );
        }
        if start > self.rows.len() {
            return Ok(());
        }
        let stop = end.min(self.rows.len());
        self.rows.drain(start - 1..stop);
        Ok(())
    }

    /// Overwrite cells starting at `start_row` (1-based), column A onward
    pub fn write_rows(&mut self, start_row: usize, rows: &[Vec<CellValue>]) -> Result<()> {
        if start_row == 0 {
            bail!("Row numbers start at 1 (sheet '{}')", self.name);
        }
        let needed = start_row - 1 + rows.len();
        if self.rows.len() < needed {
            self.rows.resize(needed, Vec::new());
        }
        for (offset, row) in rows.iter().enumerate() {
            self.rows[start_row - 1 + offset] = row.clone();
        }
        Ok(())
    }

    pub fn to_table(&self) -> Table {
        Table::from_grid(&self.rows[..self.row_count()])
    }
}

/// All sheets of one spreadsheet, in tab order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkbookGrid {
    pub sheets: Vec<SheetGrid>,
}

impl WorkbookGrid {
    pub fn new(sheets: Vec<SheetGrid>) -> Self {
        Self { sheets }
    }

    pub fn sheet(&self, name: &str) -> Option<&SheetGrid> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut SheetGrid> {
        self.sheets.iter_mut().find(|s| s.name == name)
    }

    pub fn select(&self, selector: &SheetSelector) -> Option<&SheetGrid> {
        match selector {
            SheetSelector::First => self.sheets.first(),
            SheetSelector::Named(name) => self.sheet(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(count: usize) -> SheetGrid {
        let rows = (1..=count)
            .map(|i| vec![CellValue::Int(i as i64)])
            .collect();
        SheetGrid::new("Alpha", rows)
    }

    #[test]
    fn test_row_count_ignores_trailing_blank_rows() {
        let mut grid = numbered(3);
        grid.rows.push(vec![CellValue::Empty, CellValue::text("")]);
        grid.rows.push(Vec::new());
        assert_eq!(grid.row_count(), 3);
    }

    #[test]
    fn test_delete_rows_shifts_rows_up() {
        let mut grid = numbered(20);
        grid.delete_rows(10, 12).unwrap();
        assert_eq!(grid.row_count(), 17);
        assert_eq!(grid.rows[9], vec![CellValue::Int(13)]);
    }

    #[test]
    fn test_delete_rows_past_end_is_clamped() {
        let mut grid = numbered(5);
        grid.delete_rows(4, 9).unwrap();
        assert_eq!(grid.row_count(), 3);
        grid.delete_rows(10, 12).unwrap();
        assert_eq!(grid.row_count(), 3);
        assert!(grid.delete_rows(0, 2).is_err());
    }

    #[test]
    fn test_write_rows_extends_grid() {
        let mut grid = numbered(2);
        grid.write_rows(4, &[vec![CellValue::text("x")]]).unwrap();
        assert_eq!(grid.row_count(), 4);
        assert!(grid.rows[2].is_empty());
    }

    #[test]
    fn test_select_first_sheet() {
        let book = WorkbookGrid::new(vec![numbered(1), SheetGrid::new("Reference", vec![])]);
        assert_eq!(book.select(&SheetSelector::First).unwrap().name, "Alpha");
        assert!(book.select(&SheetSelector::Named("Reference".into())).is_some());
        assert!(book.select(&SheetSelector::Named("Missing".into())).is_none());
    }
}
