use callroster_core::section::parse_line;
use callroster_storage::{A1Range, StoreError, TabularStore};
use tracing::{debug, info, warn};

/// Inclusive, one-based row span of a report section in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionSpan {
    pub start_row: u32,
    pub end_row: u32,
}

impl SectionSpan {
    pub fn row_count(&self) -> u32 {
        self.end_row - self.start_row + 1
    }
}

pub fn marker_column_range(log_table: &str) -> A1Range {
    A1Range::columns(log_table, 0, 0)
}

/// Reads the marker column; a log table that does not exist yet reads as `None`.
pub fn read_marker_column<S: TabularStore + ?Sized>(
    store: &S,
    log_table: &str,
) -> Result<Option<Vec<String>>, StoreError> {
    match store.read(&marker_column_range(log_table)) {
        Ok(rows) => Ok(Some(
            rows.into_iter()
                .map(|row| {
                    row.into_iter()
                        .next()
                        .flatten()
                        .unwrap_or_default()
                })
                .collect(),
        )),
        Err(StoreError::TableNotFound(_)) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Finds the section opened by today's start marker. It ends just before the
/// next start marker of any date, or at the last populated row of the log.
pub fn find_section_span(markers: &[String], date_key: &str) -> Option<SectionSpan> {
    let start_index = markers
        .iter()
        .position(|value| parse_line(value).opens_section_for(date_key))?;
    let start_row = start_index as u32 + 1;

    let end_row = match markers[start_index + 1..]
        .iter()
        .position(|value| parse_line(value).is_section_start())
    {
        Some(offset) => {
            let next_start_row = start_row + 1 + offset as u32;
            debug!(next_start_row, "found start of next report section");
            next_start_row - 1
        }
        None => markers.len() as u32,
    };

    Some(SectionSpan {
        start_row,
        end_row: end_row.max(start_row),
    })
}

pub fn locate_section<S: TabularStore + ?Sized>(
    store: &S,
    log_table: &str,
    date_key: &str,
) -> Result<Option<SectionSpan>, StoreError> {
    info!(table = log_table, date_key, "searching for existing report section");
    let Some(markers) = read_marker_column(store, log_table)? else {
        warn!(
            table = log_table,
            "report table not found; it will be created on write"
        );
        return Ok(None);
    };

    let span = find_section_span(&markers, date_key);
    match span {
        Some(span) => info!(
            start_row = span.start_row,
            end_row = span.end_row,
            "found existing report section"
        ),
        None => info!(date_key, "no existing report section"),
    }
    Ok(span)
}
