use crate::StoreError;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Zero-based column index to spreadsheet letters (`0 -> A`, `26 -> AA`).
pub fn column_letter(index: u32) -> String {
    let mut letters = Vec::new();
    let mut remaining = i64::from(index);
    while remaining >= 0 {
        letters.push((b'A' + (remaining % 26) as u8) as char);
        remaining = remaining / 26 - 1;
    }
    letters.iter().rev().collect()
}

pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut index: u32 = 0;
    for ch in letters.chars() {
        let ch = ch.to_ascii_uppercase();
        if !ch.is_ascii_uppercase() {
            return None;
        }
        index = index
            .checked_mul(26)?
            .checked_add(u32::from(ch as u8 - b'A') + 1)?;
    }
    Some(index - 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub col: u32,
    /// One-based; `None` leaves the row side of the bound open.
    pub row: Option<u32>,
}

/// `Table!A1:Z99` style address. Columns are zero-based, rows one-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A1Range {
    pub table: String,
    pub start: CellRef,
    pub end: Option<CellRef>,
}

fn range_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?:'(?P<quoted>(?:[^']|'')+)'|(?P<bare>[^!']+))!(?P<c1>[A-Za-z]+)(?P<r1>[0-9]+)?(?::(?P<c2>[A-Za-z]+)(?P<r2>[0-9]+)?)?$",
        )
        .expect("valid regex")
    })
}

impl A1Range {
    pub fn cell(table: impl Into<String>, col: u32, row: u32) -> Self {
        Self {
            table: table.into(),
            start: CellRef {
                col,
                row: Some(row),
            },
            end: None,
        }
    }

    pub fn columns(table: impl Into<String>, first_col: u32, last_col: u32) -> Self {
        Self {
            table: table.into(),
            start: CellRef {
                col: first_col,
                row: None,
            },
            end: Some(CellRef {
                col: last_col,
                row: None,
            }),
        }
    }

    pub fn block(
        table: impl Into<String>,
        first_col: u32,
        first_row: u32,
        last_col: u32,
        last_row: Option<u32>,
    ) -> Self {
        Self {
            table: table.into(),
            start: CellRef {
                col: first_col,
                row: Some(first_row),
            },
            end: Some(CellRef {
                col: last_col,
                row: last_row,
            }),
        }
    }

    pub fn parse(value: &str) -> Result<Self, StoreError> {
        let invalid = |reason: &str| StoreError::InvalidRange {
            range: value.to_string(),
            reason: reason.to_string(),
        };
        let captures = range_pattern()
            .captures(value.trim())
            .ok_or_else(|| invalid("expected Table!A1 or Table!A1:B2"))?;

        let table = match (captures.name("quoted"), captures.name("bare")) {
            (Some(quoted), _) => quoted.as_str().replace("''", "'"),
            (None, Some(bare)) => bare.as_str().to_string(),
            (None, None) => return Err(invalid("missing table name")),
        };

        let parse_ref = |col: &str, row: Option<&str>| -> Result<CellRef, StoreError> {
            let col = column_index(col).ok_or_else(|| invalid("column out of range"))?;
            let row = match row {
                Some(row) => {
                    let row: u32 = row.parse().map_err(|_| invalid("row out of range"))?;
                    if row == 0 {
                        return Err(invalid("rows are 1-based"));
                    }
                    Some(row)
                }
                None => None,
            };
            Ok(CellRef { col, row })
        };

        let start = parse_ref(
            captures.name("c1").map_or("", |m| m.as_str()),
            captures.name("r1").map(|m| m.as_str()),
        )?;
        let end = match captures.name("c2") {
            Some(col) => Some(parse_ref(col.as_str(), captures.name("r2").map(|m| m.as_str()))?),
            None => None,
        };

        let range = Self { table, start, end };
        if range.last_col() < range.first_col() {
            return Err(invalid("end column precedes start column"));
        }
        if matches!(range.last_row(), Some(last) if last < range.first_row()) {
            return Err(invalid("end row precedes start row"));
        }
        Ok(range)
    }

    /// Parses a table-less address such as `A:BD` against `table`.
    pub fn parse_in(table: &str, address: &str) -> Result<Self, StoreError> {
        Self::parse(&format!("{}!{}", quote_table(table), address.trim()))
    }

    pub fn first_col(&self) -> u32 {
        self.start.col
    }

    pub fn last_col(&self) -> u32 {
        self.end.map_or(self.start.col, |end| end.col)
    }

    pub fn first_row(&self) -> u32 {
        self.start.row.unwrap_or(1)
    }

    /// `None` means the range runs to the end of the table.
    pub fn last_row(&self) -> Option<u32> {
        match self.end {
            Some(end) => end.row,
            None => self.start.row,
        }
    }

    pub fn contains(&self, row: u32, col: u32) -> bool {
        row >= self.first_row()
            && self.last_row().map_or(true, |last| row <= last)
            && col >= self.first_col()
            && col <= self.last_col()
    }
}

pub fn quote_table(table: &str) -> String {
    if !table.is_empty()
        && table
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    {
        table.to_string()
    } else {
        format!("'{}'", table.replace('\'', "''"))
    }
}

impl fmt::Display for A1Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", quote_table(&self.table), column_letter(self.start.col))?;
        if let Some(row) = self.start.row {
            write!(f, "{row}")?;
        }
        if let Some(end) = self.end {
            write!(f, ":{}", column_letter(end.col))?;
            if let Some(row) = end.row {
                write!(f, "{row}")?;
            }
        }
        Ok(())
    }
}
