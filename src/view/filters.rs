// src/view/filters.rs
use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::db::TABLE_NAME;

/// Which cumulative counter the filter view plots.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cases,
    Deaths,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Cases => "cases",
            Metric::Deaths => "deaths",
        }
    }
}

impl FromStr for Metric {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "cases" => Ok(Metric::Cases),
            "deaths" => Ok(Metric::Deaths),
            other => Err(anyhow!("unknown metric `{}` (expected cases or deaths)", other)),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The dropdown selections. Every field is optional except the metric.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    pub state: Option<String>,
    pub county: Option<String>,
    pub metric: Metric,
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date `{}` (expected YYYY-MM-DD)", raw.trim()))
}

/// Quote a string literal for SQL, doubling embedded single quotes.
pub fn sql_literal(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', "''"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Filters {
    pub fn is_default(&self) -> bool {
        *self == Filters::default()
    }

    /// Changing the state invalidates the county choice.
    pub fn set_state(&mut self, state: Option<String>) {
        let state = non_empty(state);
        if state != self.state {
            self.county = None;
        }
        self.state = state;
    }

    pub fn set_county(&mut self, county: Option<String>) {
        self.county = non_empty(county);
    }

    fn conditions(&self) -> Vec<String> {
        let mut conds = Vec::new();
        if let Some(state) = &self.state {
            conds.push(format!("state = {}", sql_literal(state)));
        }
        if let Some(county) = &self.county {
            conds.push(format!("county = {}", sql_literal(county)));
        }
        if let Some(since) = self.since {
            conds.push(format!("date >= '{}'", since.format("%Y-%m-%d")));
        }
        if let Some(until) = self.until {
            conds.push(format!("date <= '{}'", until.format("%Y-%m-%d")));
        }
        conds
    }

    /// Daily totals of the chosen metric over the selected region and range.
    pub fn to_sql(&self) -> String {
        let metric = self.metric.as_str();
        let conds = self.conditions();
        let where_clause = if conds.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conds.join(" AND "))
        };
        format!(
            "SELECT date, SUM({m}) AS {m} FROM {t}{w} GROUP BY date ORDER BY date;",
            m = metric,
            t = TABLE_NAME,
            w = where_clause
        )
    }
}

/// Query listing every state for the state dropdown.
pub fn state_options_sql() -> String {
    format!("SELECT DISTINCT state FROM {} ORDER BY state;", TABLE_NAME)
}

/// Query listing the counties of `state` for the county dropdown.
pub fn county_options_sql(state: &str) -> String {
    format!(
        "SELECT DISTINCT county FROM {} WHERE state = {} ORDER BY county;",
        TABLE_NAME,
        sql_literal(state)
    )
}
