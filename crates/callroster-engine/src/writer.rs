use crate::locate::{locate_section, read_marker_column, SectionSpan};
use callroster_core::section::render_section;
use callroster_core::RunReport;
use callroster_storage::{A1Range, Cell, Rows, StoreError, TabularStore};
use tracing::{info, warn};

/// Last column cleared when a section is overwritten (`Z`).
pub const CLEAR_LAST_COL: u32 = 25;
/// Widest column a log row is moved with (`XFD`).
pub const LAST_SHEET_COL: u32 = 16_383;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionWrite {
    Overwrote {
        span: SectionSpan,
        rows_written: u32,
        shifted_rows: u32,
    },
    Appended {
        start_row: u32,
        rows_written: u32,
        created_table: bool,
    },
}

pub struct ReportWriter {
    log_table: String,
}

impl ReportWriter {
    pub fn new(log_table: impl Into<String>) -> Self {
        Self {
            log_table: log_table.into(),
        }
    }

    pub fn log_table(&self) -> &str {
        &self.log_table
    }

    /// Replaces today's section in place when one exists, otherwise appends a new one.
    pub fn write<S: TabularStore + ?Sized>(
        &self,
        store: &mut S,
        report: &RunReport,
    ) -> Result<SectionWrite, StoreError> {
        let lines: Rows = render_section(report)
            .into_iter()
            .map(|line| vec![Some(line)])
            .collect();
        info!(rows = lines.len(), "formatted report section");

        match locate_section(store, &self.log_table, &report.date_key)? {
            Some(span) => self.overwrite(store, span, &lines),
            None => self.append(store, &lines),
        }
    }

    /// Clears `A:Z` of the old span and writes the new section from its start
    /// row. When the section grows, whole rows below it move down intact.
    fn overwrite<S: TabularStore + ?Sized>(
        &self,
        store: &mut S,
        span: SectionSpan,
        lines: &[Vec<Cell>],
    ) -> Result<SectionWrite, StoreError> {
        let new_len = lines.len() as u32;
        let mut tail: Rows = Vec::new();
        if new_len > span.row_count() {
            tail = store.read(&A1Range::block(
                &self.log_table,
                0,
                span.end_row + 1,
                LAST_SHEET_COL,
                None,
            ))?;
        }

        let clear_range = A1Range::block(&self.log_table, 0, span.start_row, CLEAR_LAST_COL, Some(span.end_row));
        info!(range = %clear_range, "clearing existing report section");
        store.clear(&clear_range)?;

        let mut updates = vec![(A1Range::cell(&self.log_table, 0, span.start_row), lines.to_vec())];
        let shifted_rows = if tail.is_empty() {
            0
        } else {
            let shift = new_len - span.row_count();
            warn!(
                rows = tail.len(),
                shift, "report section grew; shifting following rows down"
            );
            store.clear(&A1Range::block(
                &self.log_table,
                0,
                span.end_row + 1,
                LAST_SHEET_COL,
                Some(span.end_row + tail.len() as u32),
            ))?;
            updates.push((A1Range::cell(&self.log_table, 0, span.start_row + new_len), tail));
            shift
        };
        store.write_batch(&updates)?;
        info!(start_row = span.start_row, rows = new_len, "report section updated");

        Ok(SectionWrite::Overwrote {
            span,
            rows_written: new_len,
            shifted_rows,
        })
    }

    fn append<S: TabularStore + ?Sized>(
        &self,
        store: &mut S,
        lines: &[Vec<Cell>],
    ) -> Result<SectionWrite, StoreError> {
        let (start_row, created_table) = match read_marker_column(store, &self.log_table)? {
            Some(markers) => (markers.len() as u32 + 1, false),
            None => {
                warn!(table = %self.log_table, "report table not found; creating it");
                store.create_table(&self.log_table)?;
                (1, true)
            }
        };

        let anchor = A1Range::cell(&self.log_table, 0, start_row);
        info!(range = %anchor, "appending new report section");
        store.write(&anchor, lines)?;
        Ok(SectionWrite::Appended {
            start_row,
            rows_written: lines.len() as u32,
            created_table,
        })
    }
}
