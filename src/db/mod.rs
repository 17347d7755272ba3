// src/db/mod.rs

pub mod load;
pub mod split;
pub mod value;

use anyhow::{Context, Result};
use duckdb::{types::Value as DuckValue, Connection};
use std::time::Instant;
use tracing::debug;

pub use load::{load_csv, reset_table, LoadOptions, LoadStats, TABLE_NAME};
pub use split::{returns_rows, split_statements};
pub use value::{ResultSet, Value};

/// Thin typed wrapper over an in-memory DuckDB connection.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open a fresh in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("opening in-memory database")?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run one or more `;`-separated statements. Every row-producing statement
    /// yields one `ResultSet`; the first failure aborts the batch.
    pub fn exec(&self, sql: &str) -> Result<Vec<ResultSet>> {
        let start = Instant::now();
        let mut results = Vec::new();
        for stmt in split_statements(sql) {
            if returns_rows(stmt) {
                results.push(self.query(stmt)?);
            } else {
                self.conn.execute_batch(stmt)?;
            }
        }
        debug!(
            result_sets = results.len(),
            elapsed = ?start.elapsed(),
            "exec finished"
        );
        Ok(results)
    }

    /// Run statements purely for effect.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .with_context(|| format!("executing `{}`", sql.trim()))
    }

    fn query(&self, stmt: &str) -> Result<ResultSet> {
        let mut prepared = self.conn.prepare(stmt)?;
        let mut rows = prepared.query([])?;
        let columns: Vec<String> = rows
            .as_ref()
            .map(|s| s.column_names())
            .unwrap_or_default();

        let mut values = Vec::new();
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                let cell: DuckValue = row.get(idx)?;
                cells.push(Value::from(cell));
            }
            values.push(cells);
        }
        Ok(ResultSet::new(columns, values))
    }

    /// First column of a single-result query as display strings.
    pub fn column_strings(&self, sql: &str) -> Result<Vec<String>> {
        let results = self.exec(sql)?;
        Ok(results
            .first()
            .map(|rs| rs.column(0).map(|v| v.to_string()).collect())
            .unwrap_or_default())
    }
}
