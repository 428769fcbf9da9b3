use crate::{
    materialize_rows, plan_writes, A1Range, Cell, CellWrite, Rows, StoreError, TabularStore,
    TABULAR_SCHEMA_VERSION,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Tables persisted as sparse cells in a single SQLite database.
pub struct SqliteTableStore {
    conn: Connection,
}

impl SqliteTableStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn schema_version(&self) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    pub fn migrate(&self) -> Result<(), StoreError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let current = self.schema_version()?;
        if current > TABULAR_SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchemaVersion {
                found: current,
                supported: TABULAR_SCHEMA_VERSION,
            });
        }

        if current < 1 {
            let sql = include_str!("../migrations/0001_tabular_schema.sql");
            self.conn.execute_batch(sql)?;
            self.conn
                .execute("PRAGMA user_version = 1", [])
                .map(|_| ())?;
        }

        Ok(())
    }

    pub fn table_names(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM tabular_tables ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    fn ensure_table(&self, table: &str) -> Result<(), StoreError> {
        if self.table_exists(table)? {
            Ok(())
        } else {
            Err(StoreError::TableNotFound(table.to_string()))
        }
    }

    fn apply_writes(tx: &Transaction<'_>, table: &str, writes: &[CellWrite]) -> Result<(), StoreError> {
        let mut upsert = tx.prepare_cached(
            "
            INSERT INTO tabular_cells (table_name, row_idx, col_idx, value)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(table_name, row_idx, col_idx) DO UPDATE SET value=excluded.value
            ",
        )?;
        let mut delete = tx.prepare_cached(
            "DELETE FROM tabular_cells WHERE table_name = ?1 AND row_idx = ?2 AND col_idx = ?3",
        )?;
        for write in writes {
            if write.value.is_empty() {
                delete.execute(params![table, write.row, write.col])?;
            } else {
                upsert.execute(params![table, write.row, write.col, write.value])?;
            }
        }
        Ok(())
    }
}

impl TabularStore for SqliteTableStore {
    fn table_exists(&self, table: &str) -> Result<bool, StoreError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM tabular_tables WHERE name = ?1",
                [table],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn create_table(&mut self, table: &str) -> Result<(), StoreError> {
        if self.table_exists(table)? {
            return Err(StoreError::TableExists(table.to_string()));
        }
        self.conn.execute(
            "INSERT INTO tabular_tables (name, created_at) VALUES (?1, ?2)",
            params![table, Utc::now().to_rfc3339()],
        )?;
        debug!(table, "created table");
        Ok(())
    }

    fn read(&self, range: &A1Range) -> Result<Rows, StoreError> {
        self.ensure_table(&range.table)?;
        let mut stmt = self.conn.prepare_cached(
            "
            SELECT row_idx, col_idx, value
            FROM tabular_cells
            WHERE table_name = ?1
              AND row_idx >= ?2
              AND (?3 IS NULL OR row_idx <= ?3)
              AND col_idx BETWEEN ?4 AND ?5
            ORDER BY row_idx, col_idx
            ",
        )?;
        let cells = stmt
            .query_map(
                params![
                    range.table,
                    range.first_row(),
                    range.last_row(),
                    range.first_col(),
                    range.last_col(),
                ],
                |row| {
                    Ok((
                        (row.get::<_, u32>(0)?, row.get::<_, u32>(1)?),
                        row.get::<_, String>(2)?,
                    ))
                },
            )?
            .collect::<Result<BTreeMap<(u32, u32), String>, _>>()?;
        Ok(materialize_rows(&cells, range))
    }

    fn write(&mut self, range: &A1Range, rows: &[Vec<Cell>]) -> Result<usize, StoreError> {
        self.write_batch(&[(range.clone(), rows.to_vec())])
    }

    fn write_batch(&mut self, updates: &[(A1Range, Rows)]) -> Result<usize, StoreError> {
        let mut planned = Vec::with_capacity(updates.len());
        for (range, rows) in updates {
            self.ensure_table(&range.table)?;
            planned.push((range.table.as_str(), plan_writes(range, rows)?));
        }

        let tx = self.conn.transaction()?;
        let mut touched = 0;
        for (table, writes) in &planned {
            Self::apply_writes(&tx, table, writes)?;
            touched += writes.len();
        }
        tx.commit()?;
        Ok(touched)
    }

    fn clear(&mut self, range: &A1Range) -> Result<(), StoreError> {
        self.ensure_table(&range.table)?;
        let removed = self.conn.execute(
            "
            DELETE FROM tabular_cells
            WHERE table_name = ?1
              AND row_idx >= ?2
              AND (?3 IS NULL OR row_idx <= ?3)
              AND col_idx BETWEEN ?4 AND ?5
            ",
            params![
                range.table,
                range.first_row(),
                range.last_row(),
                range.first_col(),
                range.last_col(),
            ],
        )?;
        debug!(range = %range, removed, "cleared range");
        Ok(())
    }

    fn append_after_last(&mut self, table: &str, rows: &[Vec<Cell>]) -> Result<u32, StoreError> {
        self.ensure_table(table)?;
        let last_row: Option<u32> = self.conn.query_row(
            "SELECT MAX(row_idx) FROM tabular_cells WHERE table_name = ?1",
            [table],
            |row| row.get(0),
        )?;
        let start_row = last_row.unwrap_or(0) + 1;
        self.write(&A1Range::cell(table, 0, start_row), rows)?;
        Ok(start_row)
    }
}
