//! Header-keyed view over a sheet's cell grid

use super::value::CellValue;

/// Canonical form for region keys and column headers
///
/// Trims, collapses internal whitespace runs to a single space and upper-cases,
/// so `" alpha   1"` and `"ALPHA 1"` are the same key.
pub fn canonicalize(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// A sheet read as records: first row is the header, the rest are data rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Canonicalized column names, in sheet order
    headers: Vec<String>,
    /// Data rows, each padded to the header width
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Build a table from raw rows where row 0 holds the headers
    pub fn from_grid(grid: &[Vec<CellValue>]) -> Self {
        let Some((header_row, data_rows)) = grid.split_first() else {
            return Self::default();
        };

        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| canonicalize(&cell.to_string()))
            .collect();
        let width = headers.len();

        let rows = data_rows
            .iter()
            .map(|row| {
                let mut row: Vec<CellValue> = row.iter().take(width).cloned().collect();
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();

        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by name (name is canonicalized before lookup)
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let key = canonicalize(name);
        self.headers.iter().position(|h| *h == key)
    }
}
