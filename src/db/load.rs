// src/db/load.rs
use anyhow::{anyhow, bail, Context, Result};
use arrow::{
    array::{Array, Int32Array, StringArray},
    csv::ReaderBuilder,
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use duckdb::{params, Appender};
use std::{
    io::Cursor,
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{debug, info};

use super::Database;

pub const TABLE_NAME: &str = "covid_counties";

/// Header the dataset must carry, in order.
pub const CSV_COLUMNS: [&str; 6] = ["date", "county", "state", "fips", "cases", "deaths"];

pub const CREATE_TABLE_SQL: &str = "CREATE TABLE covid_counties (date TEXT, county TEXT, state TEXT, fips INTEGER, cases INTEGER, deaths INTEGER);";

#[derive(Clone, Debug)]
pub struct LoadOptions {
    /// Rows parsed and appended per unit of work.
    pub chunk_rows: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { chunk_rows: 100 }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LoadStats {
    pub rows: usize,
    pub chunks: usize,
    pub elapsed: Duration,
}

/// Drop and recreate the records table.
pub fn reset_table(db: &Database) -> Result<()> {
    db.execute_batch(&format!("DROP TABLE IF EXISTS {};", TABLE_NAME))?;
    db.execute_batch(CREATE_TABLE_SQL)?;
    Ok(())
}

fn csv_schema() -> Schema {
    Schema::new(vec![
        Field::new("date", DataType::Utf8, true),
        Field::new("county", DataType::Utf8, true),
        Field::new("state", DataType::Utf8, true),
        Field::new("fips", DataType::Int32, true),
        Field::new("cases", DataType::Int32, true),
        Field::new("deaths", DataType::Int32, true),
    ])
}

/// Reject a body whose header row is not exactly the expected columns.
pub fn check_header(bytes: &[u8]) -> Result<()> {
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let end = body.iter().position(|&b| b == b'\n').unwrap_or(body.len());
    let line = std::str::from_utf8(&body[..end]).context("CSV header is not UTF-8")?;
    let line = line.trim_end_matches('\r');
    if line.trim().is_empty() {
        bail!("CSV is empty: expected header {}", CSV_COLUMNS.join(","));
    }

    let found: Vec<String> = line
        .split(',')
        .map(|h| h.trim().trim_matches('"').to_string())
        .collect();
    if found != CSV_COLUMNS {
        bail!(
            "CSV header mismatch: expected `{}`, found `{}`",
            CSV_COLUMNS.join(","),
            line
        );
    }
    Ok(())
}

/// Parse `bytes` and append every record into `covid_counties`.
/// Rows are appended and flushed one chunk at a time.
pub fn load_csv(db: &Database, bytes: &[u8], options: &LoadOptions) -> Result<LoadStats> {
    check_header(bytes)?;
    let start = Instant::now();
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    let reader = ReaderBuilder::new(Arc::new(csv_schema()))
        .with_header(true)
        .with_batch_size(options.chunk_rows.max(1))
        .build(Cursor::new(body))
        .context("building CSV reader")?;

    let mut appender = db
        .connection()
        .appender(TABLE_NAME)
        .with_context(|| format!("opening appender on {}", TABLE_NAME))?;

    let mut stats = LoadStats::default();
    for batch in reader {
        let batch = batch.with_context(|| format!("parsing CSV chunk {}", stats.chunks))?;
        append_batch(&mut appender, &batch)?;
        appender
            .flush()
            .with_context(|| format!("flushing chunk {}", stats.chunks))?;
        stats.rows += batch.num_rows();
        stats.chunks += 1;
        debug!(chunk = stats.chunks, rows = stats.rows, "chunk appended");
    }
    stats.elapsed = start.elapsed();

    info!(
        table = TABLE_NAME,
        rows = stats.rows,
        chunks = stats.chunks,
        elapsed = ?stats.elapsed,
        "dataset loaded"
    );
    Ok(stats)
}

fn text_column<'a>(batch: &'a RecordBatch, idx: usize) -> Result<&'a StringArray> {
    batch
        .column(idx)
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| anyhow!("column `{}` is not text", CSV_COLUMNS[idx]))
}

fn int_column<'a>(batch: &'a RecordBatch, idx: usize) -> Result<&'a Int32Array> {
    batch
        .column(idx)
        .as_any()
        .downcast_ref::<Int32Array>()
        .ok_or_else(|| anyhow!("column `{}` is not an integer", CSV_COLUMNS[idx]))
}

fn text_at(arr: &StringArray, row: usize) -> Option<&str> {
    if arr.is_null(row) {
        None
    } else {
        Some(arr.value(row))
    }
}

fn int_at(arr: &Int32Array, row: usize) -> Option<i32> {
    if arr.is_null(row) {
        None
    } else {
        Some(arr.value(row))
    }
}

fn append_batch(appender: &mut Appender<'_>, batch: &RecordBatch) -> Result<()> {
    let date = text_column(batch, 0)?;
    let county = text_column(batch, 1)?;
    let state = text_column(batch, 2)?;
    let fips = int_column(batch, 3)?;
    let cases = int_column(batch, 4)?;
    let deaths = int_column(batch, 5)?;

    for row in 0..batch.num_rows() {
        appender
            .append_row(params![
                text_at(date, row),
                text_at(county, row),
                text_at(state, row),
                // unknown counties have no FIPS code
                int_at(fips, row).unwrap_or(0),
                int_at(cases, row),
                int_at(deaths, row),
            ])
            .with_context(|| format!("appending row {}", row))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Value;

    const SAMPLE: &str = "date,county,state,fips,cases,deaths
2020-01-21,Snohomish,Washington,53061,1,0
2020-01-22,Snohomish,Washington,53061,1,0
2020-03-01,New York City,New York,,12,
2020-03-01,\"King, County\",Washington,53033,14,3
";

    fn loaded(chunk_rows: usize) -> Result<(Database, LoadStats)> {
        let db = Database::open_in_memory()?;
        reset_table(&db)?;
        let stats = load_csv(&db, SAMPLE.as_bytes(), &LoadOptions { chunk_rows })?;
        Ok((db, stats))
    }

    #[test]
    fn loads_every_row_in_chunks() -> Result<()> {
        let (db, stats) = loaded(3)?;
        assert_eq!(stats.rows, 4);
        assert_eq!(stats.chunks, 2);

        let n = db.exec("SELECT COUNT(*) FROM covid_counties")?;
        assert_eq!(n[0].values[0][0], Value::Integer(4));
        Ok(())
    }

    #[test]
    fn empty_fips_becomes_zero_and_empty_counts_null() -> Result<()> {
        let (db, _) = loaded(100)?;
        let rs = db.exec(
            "SELECT fips, cases, deaths FROM covid_counties WHERE county = 'New York City'",
        )?;
        assert_eq!(
            rs[0].values,
            vec![vec![Value::Integer(0), Value::Integer(12), Value::Null]]
        );
        Ok(())
    }

    #[test]
    fn quoted_fields_keep_their_commas() -> Result<()> {
        let (db, _) = loaded(100)?;
        let rs = db.exec("SELECT county FROM covid_counties WHERE fips = 53033")?;
        assert_eq!(rs[0].values[0][0], Value::Text("King, County".into()));
        Ok(())
    }

    #[test]
    fn reset_discards_previous_rows() -> Result<()> {
        let (db, _) = loaded(100)?;
        reset_table(&db)?;
        let n = db.exec("SELECT COUNT(*) FROM covid_counties")?;
        assert_eq!(n[0].values[0][0], Value::Integer(0));
        Ok(())
    }

    #[test]
    fn header_must_match() {
        assert!(check_header(b"date,county,state,fips,cases,deaths\r\n").is_ok());
        assert!(check_header(b"\xEF\xBB\xBFdate,county,state,fips,cases,deaths").is_ok());
        assert!(check_header(b"date,state,county,fips,cases,deaths\n").is_err());
        assert!(check_header(b"date,county,state,fips,cases\n").is_err());
        assert!(check_header(b"").is_err());
        // names are case-sensitive
        assert!(check_header(b"DATE,County,state,fips,cases,deaths\n").is_err());
        assert!(check_header(b"\"date\",county,state,fips,cases,deaths\n").is_ok());
    }

    #[test]
    fn header_only_loads_nothing() -> Result<()> {
        let db = Database::open_in_memory()?;
        reset_table(&db)?;
        let stats = load_csv(
            &db,
            b"date,county,state,fips,cases,deaths\n",
            &LoadOptions::default(),
        )?;
        assert_eq!(stats.rows, 0);
        Ok(())
    }
}
