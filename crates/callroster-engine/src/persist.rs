use crate::normalize::{ColumnMap, SchemaWarning};
use callroster_core::config::ColumnNames;
use callroster_core::{LogicalColumn, Record};
use callroster_storage::{A1Range, Cell, Rows, StoreError, TabularStore};
use tracing::{info, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteBackReport {
    pub rows_written: usize,
    pub cells_updated: usize,
    pub warnings: Vec<SchemaWarning>,
}

/// One row update per processed record, anchored at `first_col` of
/// `origin_row`. `first_col` is the column the header was read from, so header
/// positions map back to physical columns. Only the stakeholder and date
/// columns carry values; every other cell is left alone.
pub fn plan_write_back(
    table: &str,
    first_col: u32,
    columns: &ColumnMap,
    names: &ColumnNames,
    records: &[Record],
    processed: &[usize],
) -> (Vec<(A1Range, Rows)>, Vec<SchemaWarning>) {
    let mut warnings = Vec::new();
    let mut targets = Vec::new();
    for column in LogicalColumn::WRITE_TARGETS {
        match columns.position(column) {
            Some(index) => targets.push((column, index)),
            None => {
                let name = names.header_for(column).to_string();
                warn!(column = %name, "column not found in header; cannot write to it");
                warnings.push(SchemaWarning::UnwritableColumn { column: name });
            }
        }
    }

    let Some(max_index) = targets.iter().map(|(_, index)| *index).max() else {
        warn!("no writeable columns found in header; skipping write-back");
        return (Vec::new(), warnings);
    };

    let updates = processed
        .iter()
        .map(|&record_index| {
            let record = &records[record_index];
            let mut row: Vec<Cell> = vec![None; max_index + 1];
            for (column, index) in &targets {
                row[*index] = Some(record.field(*column).to_string());
            }
            (A1Range::cell(table, first_col, record.origin_row), vec![row])
        })
        .collect();
    (updates, warnings)
}

pub fn write_back<S: TabularStore + ?Sized>(
    store: &mut S,
    table: &str,
    first_col: u32,
    columns: &ColumnMap,
    names: &ColumnNames,
    records: &[Record],
    processed: &[usize],
) -> Result<WriteBackReport, StoreError> {
    let (updates, warnings) = plan_write_back(table, first_col, columns, names, records, processed);
    if updates.is_empty() {
        info!(table, "no updates to write back");
        return Ok(WriteBackReport {
            warnings,
            ..WriteBackReport::default()
        });
    }

    info!(table, rows = updates.len(), "executing batch update");
    let cells_updated = store.write_batch(&updates)?;
    info!(table, cells_updated, "batch update completed");
    Ok(WriteBackReport {
        rows_written: updates.len(),
        cells_updated,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use callroster_storage::InMemoryTableStore;

    fn header(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn writes_target_columns_and_leaves_others_untouched() {
        let mut store = InMemoryTableStore::new().with_table(
            "Sheet1",
            vec![
                vec!["export"],
                vec!["Id", "Stakeholder", "Call-status", "Date", "Date 2", "Date 3"],
                vec!["11", "", "Fresh", "", "", ""],
                vec!["12", "", "Delivered", "", "", ""],
            ],
        );
        let names = ColumnNames::default();
        let columns = ColumnMap::resolve(
            &header(&["Id", "Stakeholder", "Call-status", "Date", "Date 2", "Date 3"]),
            &names,
        );
        let mut record = Record::new(3, "Fresh");
        record.stakeholder = "A".to_string();
        record.attempt_dates[0] = "01-May-2025".to_string();
        record.order_id = "changed-in-memory".to_string();

        let report = write_back(&mut store, "Sheet1", 0, &columns, &names, &[record], &[0])
            .expect("write back");
        assert_eq!(report.rows_written, 1);
        assert_eq!(report.cells_updated, 4);
        assert!(report.warnings.is_empty());

        let rows = store.dump("Sheet1").expect("dump");
        assert_eq!(rows[2], vec!["11", "A", "Fresh", "01-May-2025"]);
        assert_eq!(rows[3], vec!["12", "", "Delivered"]);
    }

    #[test]
    fn header_read_from_a_later_column_writes_to_physical_columns() {
        let mut store = InMemoryTableStore::new().with_table(
            "Sheet1",
            vec![
                vec!["#", "Orders export"],
                vec!["#", "Call-status", "Stakeholder", "Date"],
                vec!["1", "Fresh", "", ""],
            ],
        );
        let names = ColumnNames::default();
        let columns = ColumnMap::resolve(&header(&["Call-status", "Stakeholder", "Date"]), &names);
        let mut record = Record::new(3, "Fresh");
        record.stakeholder = "A".to_string();
        record.attempt_dates[0] = "01-May-2025".to_string();

        write_back(&mut store, "Sheet1", 1, &columns, &names, &[record], &[0]).expect("write back");
        let rows = store.dump("Sheet1").expect("dump");
        assert_eq!(rows[2], vec!["1", "Fresh", "A", "01-May-2025"]);
    }

    #[test]
    fn missing_target_columns_are_skipped_with_warnings() {
        let names = ColumnNames::default();
        let columns = ColumnMap::resolve(&header(&["Call-status", "Date"]), &names);
        let records = vec![Record::new(3, "NDR")];
        let (updates, warnings) = plan_write_back("Sheet1", 0, &columns, &names, &records, &[0]);

        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].1[0].len(), 2);
        assert_eq!(updates[0].1[0][0], None);
        assert_eq!(warnings.len(), 3);
    }

    #[test]
    fn no_target_columns_means_no_writes() {
        let names = ColumnNames::default();
        let columns = ColumnMap::resolve(&header(&["Call-status"]), &names);
        let mut store = InMemoryTableStore::new();
        let report = write_back(&mut store, "Sheet1", 0, &columns, &names, &[Record::new(3, "NDR")], &[0])
            .expect("nothing to write");
        assert_eq!(report.rows_written, 0);
        assert_eq!(report.warnings.len(), 4);
    }
}
