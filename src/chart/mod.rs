// src/chart/mod.rs
//
// Turns a query result into plottable series and renders them as SVG.

pub mod scale;
pub mod svg;

use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt, str::FromStr};

use crate::db::{ResultSet, Value};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Table,
    Line,
    Bar,
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Table => "table",
            ChartKind::Line => "line",
            ChartKind::Bar => "bar",
        }
    }

    pub fn is_chart(&self) -> bool {
        !matches!(self, ChartKind::Table)
    }
}

impl FromStr for ChartKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "table" => Ok(ChartKind::Table),
            "line" => Ok(ChartKind::Line),
            "bar" => Ok(ChartKind::Bar),
            other => Err(anyhow!("unknown chart kind `{}` (expected table, line or bar)", other)),
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margin {
    fn default() -> Self {
        Self {
            top: 20.0,
            right: 120.0,
            bottom: 40.0,
            left: 60.0,
        }
    }
}

/// What to draw and how big.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartSpec {
    pub kind: ChartKind,
    /// X column; defaults to the first column.
    pub x: Option<String>,
    /// Y columns; defaults to every numeric column other than x.
    pub y: Vec<String>,
    pub width: f64,
    pub height: f64,
    pub margin: Margin,
}

impl ChartSpec {
    pub fn new(kind: ChartKind) -> Self {
        Self {
            kind,
            x: None,
            y: Vec::new(),
            width: 960.0,
            height: 500.0,
            margin: Margin::default(),
        }
    }
}

/// Position of a row along the x axis.
#[derive(Clone, Debug, PartialEq)]
pub enum XValue {
    Date(NaiveDate),
    Number(f64),
    Category(String),
}

impl XValue {
    pub fn label(&self) -> String {
        match self {
            XValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            XValue::Number(n) => n.to_string(),
            XValue::Category(c) => c.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum XAxis {
    Time,
    Linear,
    Band,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Series {
    pub name: String,
    pub points: Vec<(XValue, f64)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Chart {
    pub spec: ChartSpec,
    pub x_label: String,
    pub x_axis: XAxis,
    pub series: Vec<Series>,
}

fn parse_day(v: &Value) -> Option<NaiveDate> {
    match v {
        Value::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
        _ => None,
    }
}

fn numeric_column(result: &ResultSet, idx: usize) -> bool {
    let mut seen = false;
    for cell in result.column(idx).filter(|c| !c.is_null()) {
        if !cell.is_numeric() {
            return false;
        }
        seen = true;
    }
    seen
}

fn detect_axis(result: &ResultSet, idx: usize) -> XAxis {
    let mut cells = result.column(idx).filter(|c| !c.is_null()).peekable();
    if cells.peek().is_none() {
        return XAxis::Band;
    }
    let cells: Vec<&Value> = cells.collect();
    if cells.iter().all(|c| parse_day(c).is_some()) {
        XAxis::Time
    } else if cells.iter().all(|c| c.is_numeric()) {
        XAxis::Linear
    } else {
        XAxis::Band
    }
}

fn x_value(axis: XAxis, cell: &Value) -> Option<XValue> {
    if cell.is_null() {
        return None;
    }
    match axis {
        XAxis::Time => parse_day(cell).map(XValue::Date),
        XAxis::Linear => cell.as_f64().map(XValue::Number),
        XAxis::Band => Some(XValue::Category(cell.to_string())),
    }
}

fn resolve(result: &ResultSet, name: &str) -> Result<usize> {
    result
        .column_index(name)
        .ok_or_else(|| anyhow!("no column named `{}` in result ({})", name, result.columns.join(", ")))
}

impl Chart {
    /// Pick axes and series out of `result`. Rows with a NULL or non-numeric
    /// y value are left out of that series.
    pub fn from_result(result: &ResultSet, spec: ChartSpec) -> Result<Self> {
        if !spec.kind.is_chart() {
            bail!("table view has nothing to chart");
        }
        if result.columns.is_empty() {
            bail!("result has no columns");
        }

        let x_idx = match &spec.x {
            Some(name) => resolve(result, name)?,
            None => 0,
        };
        let y_idx: Vec<usize> = if spec.y.is_empty() {
            (0..result.columns.len())
                .filter(|&i| i != x_idx && numeric_column(result, i))
                .collect()
        } else {
            spec.y
                .iter()
                .map(|name| resolve(result, name))
                .collect::<Result<_>>()?
        };
        if y_idx.is_empty() {
            bail!(
                "nothing to plot: no numeric column besides `{}`",
                result.columns[x_idx]
            );
        }

        let x_axis = detect_axis(result, x_idx);
        let series = y_idx
            .iter()
            .map(|&yi| Series {
                name: result.columns[yi].clone(),
                points: result
                    .values
                    .iter()
                    .filter_map(|row| {
                        let x = x_value(x_axis, row.get(x_idx)?)?;
                        let y = row.get(yi)?.as_f64()?;
                        Some((x, y))
                    })
                    .collect(),
            })
            .collect();

        Ok(Self {
            x_label: result.columns[x_idx].clone(),
            x_axis,
            series,
            spec,
        })
    }

    pub fn point_count(&self) -> usize {
        self.series.iter().map(|s| s.points.len()).sum()
    }

    /// Smallest and largest y across all series, always including zero.
    pub fn y_extent(&self) -> (f64, f64) {
        let mut lo = 0.0f64;
        let mut hi = 0.0f64;
        for (_, y) in self.series.iter().flat_map(|s| s.points.iter()) {
            lo = lo.min(*y);
            hi = hi.max(*y);
        }
        if lo == hi {
            hi = lo + 1.0;
        }
        (lo, hi)
    }

    /// Distinct x values in order of first appearance.
    pub fn categories(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out: Vec<String> = Vec::new();
        for (x, _) in self.series.iter().flat_map(|s| s.points.iter()) {
            let label = x.label();
            if seen.insert(label.clone()) {
                out.push(label);
            }
        }
        out
    }

    pub fn to_svg(&self) -> String {
        svg::render(self)
    }
}
