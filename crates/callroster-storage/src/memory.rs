use crate::{materialize_rows, plan_writes, A1Range, Cell, Rows, StoreError, TabularStore};
use std::collections::BTreeMap;

type Grid = BTreeMap<(u32, u32), String>;

#[derive(Debug, Default, Clone)]
pub struct InMemoryTableStore {
    tables: BTreeMap<String, Grid>,
}

impl InMemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds `table` with dense rows starting at `A1`; empty strings stay blank.
    pub fn with_table<R, C>(mut self, table: &str, rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let grid = self.tables.entry(table.to_string()).or_default();
        for (row_offset, row) in rows.into_iter().enumerate() {
            for (col_offset, value) in row.into_iter().enumerate() {
                let value: String = value.into();
                if !value.is_empty() {
                    grid.insert((row_offset as u32 + 1, col_offset as u32), value);
                }
            }
        }
        self
    }

    /// Dense copy of `table` from `A1`, blank cells as empty strings.
    pub fn dump(&self, table: &str) -> Option<Vec<Vec<String>>> {
        let grid = self.tables.get(table)?;
        let rows = materialize_rows(grid, &A1Range::block(table, 0, 1, u32::MAX, None));
        Some(
            rows.into_iter()
                .map(|row| row.into_iter().map(Option::unwrap_or_default).collect())
                .collect(),
        )
    }

    pub fn cell_value(&self, table: &str, row: u32, col: u32) -> Option<&str> {
        self.tables
            .get(table)
            .and_then(|grid| grid.get(&(row, col)))
            .map(String::as_str)
    }

    fn grid(&self, table: &str) -> Result<&Grid, StoreError> {
        self.tables
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))
    }

    fn grid_mut(&mut self, table: &str) -> Result<&mut Grid, StoreError> {
        self.tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))
    }
}

impl TabularStore for InMemoryTableStore {
    fn table_exists(&self, table: &str) -> Result<bool, StoreError> {
        Ok(self.tables.contains_key(table))
    }

    fn create_table(&mut self, table: &str) -> Result<(), StoreError> {
        if self.tables.contains_key(table) {
            return Err(StoreError::TableExists(table.to_string()));
        }
        self.tables.insert(table.to_string(), Grid::new());
        Ok(())
    }

    fn read(&self, range: &A1Range) -> Result<Rows, StoreError> {
        let grid = self.grid(&range.table)?;
        let cells: Grid = grid
            .iter()
            .filter(|((row, col), _)| range.contains(*row, *col))
            .map(|(key, value)| (*key, value.clone()))
            .collect();
        Ok(materialize_rows(&cells, range))
    }

    fn write(&mut self, range: &A1Range, rows: &[Vec<Cell>]) -> Result<usize, StoreError> {
        let writes = plan_writes(range, rows)?;
        let grid = self.grid_mut(&range.table)?;
        for write in &writes {
            if write.value.is_empty() {
                grid.remove(&(write.row, write.col));
            } else {
                grid.insert((write.row, write.col), write.value.clone());
            }
        }
        Ok(writes.len())
    }

    fn clear(&mut self, range: &A1Range) -> Result<(), StoreError> {
        let grid = self.grid_mut(&range.table)?;
        grid.retain(|(row, col), _| !range.contains(*row, *col));
        Ok(())
    }

    fn append_after_last(&mut self, table: &str, rows: &[Vec<Cell>]) -> Result<u32, StoreError> {
        let last_row = self
            .grid(table)?
            .keys()
            .map(|(row, _)| *row)
            .max()
            .unwrap_or(0);
        let start_row = last_row + 1;
        self.write(&A1Range::cell(table, 0, start_row), rows)?;
        Ok(start_row)
    }
}
