use std::collections::BTreeMap;
use thiserror::Error;

pub mod memory;
pub mod range;
pub mod sqlite;

pub use memory::InMemoryTableStore;
pub use range::{column_index, column_letter, A1Range, CellRef};
pub use sqlite::SqliteTableStore;

pub const TABULAR_SCHEMA_VERSION: i64 = 1;

/// A cell as read from or written to a table. On write, `None` leaves the
/// addressed cell untouched and `Some("")` clears it.
pub type Cell = Option<String>;
pub type Rows = Vec<Vec<Cell>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("table not found: {0}")]
    TableNotFound(String),
    #[error("table already exists: {0}")]
    TableExists(String),
    #[error("invalid range {range}: {reason}")]
    InvalidRange { range: String, reason: String },
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("unsupported schema version {found}, max supported {supported}")]
    UnsupportedSchemaVersion { found: i64, supported: i64 },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::TableNotFound(_))
    }
}

/// Rectangular string storage addressed by A1 ranges.
pub trait TabularStore {
    fn table_exists(&self, table: &str) -> Result<bool, StoreError>;

    fn create_table(&mut self, table: &str) -> Result<(), StoreError>;

    /// Rows from the first row of `range` through the last row holding a value
    /// inside it. Each row stops at its last populated cell; gaps read as `None`.
    fn read(&self, range: &A1Range) -> Result<Rows, StoreError>;

    /// Writes `rows` anchored at the top-left of `range`, returning the number
    /// of cells touched.
    fn write(&mut self, range: &A1Range, rows: &[Vec<Cell>]) -> Result<usize, StoreError>;

    fn write_batch(&mut self, updates: &[(A1Range, Rows)]) -> Result<usize, StoreError> {
        let mut touched = 0;
        for (range, rows) in updates {
            touched += self.write(range, rows)?;
        }
        Ok(touched)
    }

    fn clear(&mut self, range: &A1Range) -> Result<(), StoreError>;

    /// Writes `rows` starting in column A on the row after the last populated
    /// row of `table`, returning that starting row.
    ///
    /// Counts a row populated if any column holds a value. The report writer
    /// appends after the last marker in column A instead, so it does not call
    /// this; the method stays for callers that append plain rows.
    fn append_after_last(&mut self, table: &str, rows: &[Vec<Cell>]) -> Result<u32, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CellWrite {
    pub row: u32,
    pub col: u32,
    pub value: String,
}

pub(crate) fn plan_writes(range: &A1Range, rows: &[Vec<Cell>]) -> Result<Vec<CellWrite>, StoreError> {
    let Some(first_row) = range.start.row else {
        return Err(StoreError::InvalidRange {
            range: range.to_string(),
            reason: "write anchor needs a row".to_string(),
        });
    };

    let bounded = range.end.is_some();
    let mut writes = Vec::new();
    for (row_offset, row) in rows.iter().enumerate() {
        let row_idx = first_row + row_offset as u32;
        for (col_offset, cell) in row.iter().enumerate() {
            let Some(value) = cell else {
                continue;
            };
            let col_idx = range.start.col + col_offset as u32;
            if bounded && !range.contains(row_idx, col_idx) {
                return Err(StoreError::InvalidRange {
                    range: range.to_string(),
                    reason: format!("data exceeds range at row {row_idx}"),
                });
            }
            writes.push(CellWrite {
                row: row_idx,
                col: col_idx,
                value: value.clone(),
            });
        }
    }
    Ok(writes)
}

/// Shapes sparse `(row, col) -> value` cells already filtered to `range`.
pub(crate) fn materialize_rows(cells: &BTreeMap<(u32, u32), String>, range: &A1Range) -> Rows {
    let Some(last_row) = cells.keys().map(|(row, _)| *row).max() else {
        return Vec::new();
    };
    let first_row = range.first_row();
    let first_col = range.first_col();
    let mut rows: Rows = vec![Vec::new(); (last_row + 1 - first_row) as usize];
    for ((row, col), value) in cells {
        let slot = &mut rows[(row - first_row) as usize];
        let offset = (col - first_col) as usize;
        if slot.len() <= offset {
            slot.resize(offset + 1, None);
        }
        slot[offset] = Some(value.clone());
    }
    rows
}
