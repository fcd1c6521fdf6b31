//! Store abstraction and A1-notation helpers shared by every backend.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};

// ── TabularStore trait ────────────────────────────────────────

/// Row/column store addressed with A1 ranges (`Tab!A1:Z`, `Tab!C5`).
///
/// Enables mocking in tests without a real spreadsheet.
#[async_trait]
pub trait TabularStore: Send + Sync {
    /// Read every row in a range. Cells are rendered as strings; rows may be ragged.
    async fn read(&self, range: &str) -> StoreResult<Vec<Vec<String>>>;

    /// Append one row after the last data row of the range's tab.
    async fn append(&self, range: &str, row: Vec<String>) -> StoreResult<()>;

    /// Write single cells in one batch.
    async fn patch(&self, updates: &[CellUpdate]) -> StoreResult<()>;
}

/// A single-cell write, e.g. `Appointments!C5` ← `"98765432"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellUpdate {
    pub range: String,
    pub value: String,
}

impl CellUpdate {
    /// Address a cell by tab, 0-based column index and 1-based row number.
    pub fn at(tab: &str, column: usize, row: usize, value: impl Into<String>) -> Self {
        Self {
            range: format!("{tab}!{}{row}", column_letter(column)),
            value: value.into(),
        }
    }
}

// ── Table ─────────────────────────────────────────────────────

/// A header row plus data rows, as read from a tab.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Split raw values into header and data rows. None when the range is empty.
    pub fn from_values(mut values: Vec<Vec<String>>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let headers = values.remove(0);
        Some(Self {
            headers,
            rows: values,
        })
    }

    /// Index of the column whose header matches exactly.
    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Sheet row number of data row `index` (header is row 1).
    pub fn row_number(index: usize) -> usize {
        index + 2
    }

    /// Data rows as header-keyed maps. Short rows pad with empty strings,
    /// cells beyond the header are dropped.
    pub fn records(&self) -> Vec<BTreeMap<String, String>> {
        self.rows
            .iter()
            .map(|row| {
                self.headers
                    .iter()
                    .enumerate()
                    .map(|(i, h)| (h.clone(), row.get(i).cloned().unwrap_or_default()))
                    .collect()
            })
            .collect()
    }

    /// Data rows as `(header, value)` pairs in header order, same padding rules as `records`.
    pub fn ordered_records(&self) -> Vec<Vec<(String, String)>> {
        self.rows
            .iter()
            .map(|row| {
                self.headers
                    .iter()
                    .enumerate()
                    .map(|(i, h)| (h.clone(), row.get(i).cloned().unwrap_or_default()))
                    .collect()
            })
            .collect()
    }
}

// ── A1 helpers ────────────────────────────────────────────────

/// Column letters for a 0-based index: 0 → A, 25 → Z, 26 → AA.
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Split `Tab!A1:Z` into the tab name (quotes stripped) and the cell part.
pub fn split_range(range: &str) -> (String, Option<&str>) {
    match range.rsplit_once('!') {
        Some((tab, cells)) => (tab.trim_matches('\'').to_string(), Some(cells)),
        None => (range.trim_matches('\'').to_string(), None),
    }
}

/// Parse a single-cell reference like `C5` into (0-based column, 1-based row).
pub fn parse_cell(cell: &str) -> StoreResult<(usize, usize)> {
    let split = cell
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| StoreError::InvalidRange(cell.into()))?;
    let (letters, digits) = cell.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(StoreError::InvalidRange(cell.into()));
    }
    let column = letters
        .to_ascii_uppercase()
        .bytes()
        .fold(0usize, |acc, b| acc * 26 + (b - b'A' + 1) as usize)
        - 1;
    let row: usize = digits
        .parse()
        .map_err(|_| StoreError::InvalidRange(cell.into()))?;
    if row == 0 {
        return Err(StoreError::InvalidRange(cell.into()));
    }
    Ok((column, row))
}
