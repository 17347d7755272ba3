use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use duckdb::types::{TimeUnit, Value as DuckValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single result cell, independent of the engine's type zoo.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view used by charting; text that parses as a number counts.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(f) if f.is_finite() => Some(*f),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Real(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => f.write_str(s),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

fn timestamp_text(unit: TimeUnit, raw: i64) -> Option<String> {
    let micros = match unit {
        TimeUnit::Second => raw.checked_mul(1_000_000)?,
        TimeUnit::Millisecond => raw.checked_mul(1_000)?,
        TimeUnit::Microsecond => raw,
        TimeUnit::Nanosecond => raw / 1_000,
    };
    DateTime::<Utc>::from_timestamp_micros(micros).map(|dt| dt.naive_utc().to_string())
}

impl From<DuckValue> for Value {
    fn from(v: DuckValue) -> Self {
        match v {
            DuckValue::Null => Value::Null,
            DuckValue::Boolean(b) => Value::Bool(b),
            DuckValue::TinyInt(i) => Value::Integer(i.into()),
            DuckValue::SmallInt(i) => Value::Integer(i.into()),
            DuckValue::Int(i) => Value::Integer(i.into()),
            DuckValue::BigInt(i) => Value::Integer(i),
            DuckValue::HugeInt(i) => match i64::try_from(i) {
                Ok(i) => Value::Integer(i),
                Err(_) => Value::Real(i as f64),
            },
            DuckValue::UTinyInt(i) => Value::Integer(i.into()),
            DuckValue::USmallInt(i) => Value::Integer(i.into()),
            DuckValue::UInt(i) => Value::Integer(i.into()),
            DuckValue::UBigInt(i) => match i64::try_from(i) {
                Ok(i) => Value::Integer(i),
                Err(_) => Value::Real(i as f64),
            },
            DuckValue::Float(f) => Value::Real(f.into()),
            DuckValue::Double(f) => Value::Real(f),
            DuckValue::Decimal(d) => {
                let text = d.to_string();
                match text.parse::<f64>() {
                    Ok(f) => Value::Real(f),
                    Err(_) => Value::Text(text),
                }
            }
            DuckValue::Text(s) => Value::Text(s),
            DuckValue::Enum(s) => Value::Text(s),
            DuckValue::Blob(b) => Value::Blob(b),
            DuckValue::Date32(days) => {
                match epoch().checked_add_signed(ChronoDuration::days(days.into())) {
                    Some(date) => Value::Text(date.format("%Y-%m-%d").to_string()),
                    None => Value::Integer(days.into()),
                }
            }
            DuckValue::Timestamp(unit, raw) => match timestamp_text(unit, raw) {
                Some(text) => Value::Text(text),
                None => Value::Integer(raw),
            },
            other => Value::Text(format!("{:?}", other)),
        }
    }
}

/// One row-producing statement's output: column names plus parallel rows.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, values: Vec<Vec<Value>>) -> Self {
        Self { columns, values }
    }

    /// Case-insensitive column lookup.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name.trim()))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.values.len()
    }

    /// Iterator over a single column's cells.
    pub fn column(&self, idx: usize) -> impl Iterator<Item = &Value> + '_ {
        self.values.iter().filter_map(move |row| row.get(idx))
    }
}
