use serde::{Deserialize, Serialize};

use sd_sheets::Table;

/// The unit of retrieval: one knowledge row flattened to text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedDocument {
    /// Sheet row number (header is row 1).
    pub row: u32,
    pub text: String,
}

impl IndexedDocument {
    /// One document per data row, `"<header>: <value>"` pairs joined by `" | "`.
    pub fn from_table(table: &Table) -> Vec<Self> {
        table
            .ordered_records()
            .into_iter()
            .enumerate()
            .map(|(i, record)| Self {
                row: Table::row_number(i) as u32,
                text: flatten(&record),
            })
            .collect()
    }
}

fn flatten(record: &[(String, String)]) -> String {
    record
        .iter()
        .map(|(header, value)| format!("{header}: {value}"))
        .collect::<Vec<_>>()
        .join(" | ")
}
