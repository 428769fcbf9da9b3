use callroster_core::config::{ColumnNames, Layout};
use callroster_core::{LogicalColumn, Record};
use callroster_storage::Cell;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("no data found in table")]
    Empty,
    #[error("not enough rows: need at least {needed}, found {found}")]
    InsufficientRows { needed: usize, found: usize },
}

/// Non-fatal schema problems. The run continues with a degraded table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaWarning {
    RowTruncated {
        origin_row: u32,
        width: usize,
        header_width: usize,
    },
    MissingColumn {
        column: String,
    },
    UnwritableColumn {
        column: String,
    },
}

impl fmt::Display for SchemaWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaWarning::RowTruncated {
                origin_row,
                width,
                header_width,
            } => write!(
                f,
                "row {origin_row} has {width} cells, header has {header_width}; truncated"
            ),
            SchemaWarning::MissingColumn { column } => {
                write!(f, "column '{column}' missing from header; treated as empty")
            }
            SchemaWarning::UnwritableColumn { column } => {
                write!(f, "column '{column}' missing from header; not written back")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    pub origin_row: u32,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedTable {
    pub header: Vec<String>,
    pub rows: Vec<NormalizedRow>,
    pub warnings: Vec<SchemaWarning>,
}

/// Header positions of the logical columns actually present in the table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    positions: BTreeMap<LogicalColumn, usize>,
}

impl ColumnMap {
    pub fn resolve(header: &[String], names: &ColumnNames) -> Self {
        let positions = LogicalColumn::ALL
            .into_iter()
            .filter_map(|column| {
                let wanted = names.header_for(column);
                header
                    .iter()
                    .position(|name| name == wanted)
                    .map(|index| (column, index))
            })
            .collect();
        Self { positions }
    }

    pub fn position(&self, column: LogicalColumn) -> Option<usize> {
        self.positions.get(&column).copied()
    }

    pub fn is_logical(&self, index: usize) -> bool {
        self.positions.values().any(|position| *position == index)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordTable {
    pub header: Vec<String>,
    pub columns: ColumnMap,
    pub records: Vec<Record>,
    pub warnings: Vec<SchemaWarning>,
}

pub struct RecordNormalizer {
    layout: Layout,
    names: ColumnNames,
}

impl RecordNormalizer {
    pub fn new(layout: Layout, names: ColumnNames) -> Self {
        Self { layout, names }
    }

    pub fn normalize(&self, raw: &[Vec<Cell>]) -> Result<RecordTable, NormalizeError> {
        let table = self.normalize_rows(raw)?;
        Ok(self.into_records(table))
    }

    /// Pads or truncates every data row to the header width.
    pub fn normalize_rows(&self, raw: &[Vec<Cell>]) -> Result<NormalizedTable, NormalizeError> {
        if raw.is_empty() {
            return Err(NormalizeError::Empty);
        }
        let needed = self.layout.data_start_row_index + 1;
        if raw.len() < needed || raw.len() <= self.layout.header_row_index {
            return Err(NormalizeError::InsufficientRows {
                needed: needed.max(self.layout.header_row_index + 1),
                found: raw.len(),
            });
        }

        let header: Vec<String> = raw[self.layout.header_row_index]
            .iter()
            .map(coerce_cell)
            .collect();
        let header_width = header.len();
        info!(
            header_row = self.layout.header_row_index + 1,
            columns = header_width,
            "identified header row"
        );

        let mut warnings = Vec::new();
        let mut rows = Vec::with_capacity(raw.len() - self.layout.data_start_row_index);
        for (offset, raw_row) in raw[self.layout.data_start_row_index..].iter().enumerate() {
            let origin_row = (self.layout.data_start_row_index + offset + 1) as u32;
            let mut cells: Vec<String> = raw_row.iter().map(coerce_cell).collect();
            if cells.len() > header_width {
                warn!(
                    origin_row,
                    width = cells.len(),
                    header_width,
                    "row wider than header; truncating"
                );
                warnings.push(SchemaWarning::RowTruncated {
                    origin_row,
                    width: cells.len(),
                    header_width,
                });
            }
            cells.resize(header_width, String::new());
            rows.push(NormalizedRow { origin_row, cells });
        }

        info!(rows = rows.len(), "normalized data rows");
        Ok(NormalizedTable {
            header,
            rows,
            warnings,
        })
    }

    /// Lifts normalized rows into typed records; absent logical columns read as empty.
    pub fn into_records(&self, table: NormalizedTable) -> RecordTable {
        let NormalizedTable {
            header,
            rows,
            mut warnings,
        } = table;
        let columns = ColumnMap::resolve(&header, &self.names);

        for column in LogicalColumn::ALL {
            if columns.position(column).is_none() {
                let name = self.names.header_for(column).to_string();
                warn!(column = %name, "column not found in header; adding it as empty");
                warnings.push(SchemaWarning::MissingColumn { column: name });
            }
        }

        let records = rows
            .into_iter()
            .map(|row| {
                let mut record = Record::new(row.origin_row, String::new());
                for column in LogicalColumn::ALL {
                    if let Some(index) = columns.position(column) {
                        record.set_field(column, row.cells[index].clone());
                    }
                }
                for (index, value) in row.cells.into_iter().enumerate() {
                    if columns.is_logical(index) {
                        continue;
                    }
                    record
                        .extra
                        .entry(header[index].clone())
                        .or_insert(value);
                }
                record
            })
            .collect();

        RecordTable {
            header,
            columns,
            records,
            warnings,
        }
    }
}

fn coerce_cell(cell: &Cell) -> String {
    cell.as_deref().map(str::trim).unwrap_or_default().to_string()
}
