// 🗄️ Table Store - one SQLite table per dataset
// Each import fully replaces a table; every row carries the batch timestamp
// (`imported_at`), which doubles as the batch identifier.
//
// The store is an explicit handle: open it once, pass it to whoever needs it,
// close it at shutdown. It is not synchronized internally; callers must not
// read a dataset while a replace of that same dataset is running.

use crate::error::StoreError;
use crate::parser::{Record, Value, STORAGE_DATE_FORMAT};
use crate::schema::{ColumnKind, Dataset};
use chrono::NaiveDateTime;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, Row};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// Batch metadata for the most recent import of a dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportInfo {
    pub imported_at: NaiveDateTime,
    pub row_count: usize,
}

pub struct TableStore {
    conn: Connection,
}

impl TableStore {
    /// Open (or create) an on-disk store and make sure every table exists
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        // Enable WAL mode for crash recovery
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;

        let store = TableStore { conn };
        store.initialize()?;
        info!(path = %path.display(), "table store opened");
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = TableStore {
            conn: Connection::open_in_memory()?,
        };
        store.initialize()?;
        Ok(store)
    }

    /// Release the underlying connection
    pub fn close(self) -> Result<(), StoreError> {
        self.conn.close().map_err(|(_, e)| StoreError::Sqlite(e))
    }

    /// Create every dataset table (empty) if it does not exist yet
    fn initialize(&self) -> Result<(), StoreError> {
        for dataset in Dataset::ALL {
            self.conn
                .execute(&create_table_sql(dataset), [])
                .map_err(StoreError::on(dataset))?;
        }
        Ok(())
    }

    // ========================================================================
    // WRITES
    // ========================================================================

    /// Atomically discard the contents of `dataset` and store `records`.
    ///
    /// Empty `records` leave the table untouched and return 0.
    pub fn replace(&mut self, dataset: Dataset, records: &[Record]) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        let schema = dataset.schema();
        let table = dataset.table_name();
        let on_table = StoreError::on;

        let tx = self.conn.transaction().map_err(on_table(dataset))?;
        tx.execute(&format!("DELETE FROM \"{table}\""), [])
            .map_err(on_table(dataset))?;

        {
            let mut stmt = tx
                .prepare(&insert_sql(dataset))
                .map_err(on_table(dataset))?;

            for record in records {
                let imported_at = record.imported_at.format(STORAGE_DATE_FORMAT).to_string();
                let params = record
                    .values
                    .iter()
                    .take(schema.canonical_columns.len())
                    .map(to_sql_value)
                    .chain(std::iter::once(SqlValue::Text(imported_at)));

                stmt.execute(params_from_iter(params))
                    .map_err(on_table(dataset))?;
            }
        }

        tx.commit().map_err(on_table(dataset))?;
        info!(dataset = %dataset, rows = records.len(), "table replaced");
        Ok(records.len())
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// Full table in ingestion order
    pub fn scan(&self, dataset: Dataset) -> Result<Vec<Record>, StoreError> {
        let schema = dataset.schema();
        let columns = quoted_columns(dataset);
        let sql = format!(
            "SELECT {columns}, imported_at FROM \"{}\" ORDER BY id",
            dataset.table_name()
        );

        let mut stmt = self.conn.prepare(&sql).map_err(StoreError::on(dataset))?;
        let records = stmt
            .query_map([], |row| {
                let mut values = Vec::with_capacity(schema.canonical_columns.len());
                for (i, column) in schema.canonical_columns.iter().enumerate() {
                    values.push(read_value(row, i, schema.column_kind(column))?);
                }
                let stamp: String = row.get(schema.canonical_columns.len())?;
                Ok((values, stamp))
            })
            .map_err(StoreError::on(dataset))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::on(dataset))?
            .into_iter()
            .map(|(values, stamp)| Record {
                dataset,
                values,
                imported_at: NaiveDateTime::parse_from_str(&stamp, STORAGE_DATE_FORMAT)
                    .unwrap_or_default(),
            })
            .collect();

        Ok(records)
    }

    /// Full table filtered in memory
    pub fn scan_where<F>(&self, dataset: Dataset, filter: F) -> Result<Vec<Record>, StoreError>
    where
        F: Fn(&Record) -> bool,
    {
        Ok(self
            .scan(dataset)?
            .into_iter()
            .filter(|r| filter(r))
            .collect())
    }

    pub fn row_count(&self, dataset: Dataset) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row(
                &format!("SELECT COUNT(*) FROM \"{}\"", dataset.table_name()),
                [],
                |row| row.get(0),
            )
            .map_err(StoreError::on(dataset))?;
        Ok(count.max(0) as usize)
    }

    /// Replace never stores an empty batch, so an empty table means the
    /// dataset was never imported.
    pub fn has_data(&self, dataset: Dataset) -> Result<bool, StoreError> {
        Ok(self.row_count(dataset)? > 0)
    }

    /// Timestamp and size of the latest batch. Advisory only: lookup failures
    /// are logged and reported as `None`.
    pub fn last_import_info(&self, dataset: Dataset) -> Option<ImportInfo> {
        let sql = format!(
            "SELECT imported_at, COUNT(*) FROM \"{}\"
             GROUP BY imported_at
             ORDER BY imported_at DESC
             LIMIT 1",
            dataset.table_name()
        );

        let row = self.conn.query_row(&sql, [], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        });

        match row {
            Ok((stamp, count)) => NaiveDateTime::parse_from_str(&stamp, STORAGE_DATE_FORMAT)
                .ok()
                .map(|imported_at| ImportInfo {
                    imported_at,
                    row_count: count.max(0) as usize,
                }),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => {
                warn!(dataset = %dataset, error = %e, "last import lookup failed");
                None
            }
        }
    }

    /// Sum of an integer column, used by advisory counters
    pub fn sum_integer(&self, dataset: Dataset, column: &str) -> Result<i64, StoreError> {
        let sql = format!(
            "SELECT COALESCE(SUM(\"{column}\"), 0) FROM \"{}\"",
            dataset.table_name()
        );
        self.conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(StoreError::on(dataset))
    }
}

// ============================================================================
// SQL HELPERS
// ============================================================================

fn quoted_columns(dataset: Dataset) -> String {
    dataset
        .schema()
        .canonical_columns
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

fn create_table_sql(dataset: Dataset) -> String {
    let schema = dataset.schema();
    let columns = schema
        .canonical_columns
        .iter()
        .map(|c| format!("\"{c}\" {}", schema.column_kind(c).sql_type()))
        .collect::<Vec<_>>()
        .join(",\n            ");

    format!(
        "CREATE TABLE IF NOT EXISTS \"{}\" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            {columns},
            imported_at TEXT NOT NULL
        )",
        dataset.table_name()
    )
}

fn insert_sql(dataset: Dataset) -> String {
    let schema = dataset.schema();
    let placeholders = (1..=schema.canonical_columns.len() + 1)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO \"{}\" ({}, imported_at) VALUES ({placeholders})",
        dataset.table_name(),
        quoted_columns(dataset)
    )
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Text(s) if s.is_empty() => SqlValue::Null,
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Date(Some(d)) => SqlValue::Text(d.format(STORAGE_DATE_FORMAT).to_string()),
        Value::Date(None) => SqlValue::Null,
        Value::Number(n) => SqlValue::Real(*n),
        Value::Integer(i) => SqlValue::Integer(*i),
    }
}

fn read_value(row: &Row<'_>, index: usize, kind: ColumnKind) -> rusqlite::Result<Value> {
    Ok(match kind {
        ColumnKind::Text => Value::Text(row.get::<_, Option<String>>(index)?.unwrap_or_default()),
        ColumnKind::Date => Value::Date(
            row.get::<_, Option<String>>(index)?
                .and_then(|s| NaiveDateTime::parse_from_str(&s, STORAGE_DATE_FORMAT).ok()),
        ),
        ColumnKind::Number => Value::Number(row.get::<_, Option<f64>>(index)?.unwrap_or(0.0)),
        ColumnKind::Integer => Value::Integer(row.get::<_, Option<i64>>(index)?.unwrap_or(0)),
    })
}

// ============================================================================
// TESTS
// ============================================================================
