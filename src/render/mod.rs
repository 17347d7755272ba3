// src/render/mod.rs
use anyhow::{anyhow, Context, Result};
use arrow::{
    array::{ArrayRef, StringArray},
    csv::WriterBuilder,
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use prettytable::{format, Cell, Row, Table};
use serde::{Deserialize, Serialize};
use std::{fmt::Write, str::FromStr, sync::Arc};

use crate::db::{ResultSet, Value};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(anyhow!("unknown output format `{}` (expected table, csv or json)", other)),
        }
    }
}

fn right_aligned(result: &ResultSet, idx: usize) -> bool {
    let mut cells = result.column(idx).filter(|v| !v.is_null()).peekable();
    cells.peek().is_some() && cells.all(Value::is_numeric)
}

/// Aligned plain-text table; numeric columns right-aligned, NULL cells empty.
pub fn render_table(result: &ResultSet) -> String {
    let align: Vec<bool> = (0..result.columns.len())
        .map(|i| right_aligned(result, i))
        .collect();

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    table.set_titles(Row::new(
        result.columns.iter().map(|c| Cell::new(c)).collect(),
    ));
    for row in &result.values {
        table.add_row(Row::new(
            row.iter()
                .zip(&align)
                .map(|(v, right)| {
                    let cell = Cell::new(&v.to_string().replace('\n', " "));
                    if *right {
                        cell.style_spec("r")
                    } else {
                        cell
                    }
                })
                .collect(),
        ));
    }

    let mut out = table.to_string();
    let _ = writeln!(
        out,
        "({} row{})",
        result.values.len(),
        if result.values.len() == 1 { "" } else { "s" }
    );
    out
}

/// CSV with a header row. Cells are written as text; NULL is an empty field.
pub fn render_csv(result: &ResultSet) -> Result<String> {
    let schema = Arc::new(Schema::new(
        result
            .columns
            .iter()
            .map(|c| Field::new(c, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    ));
    let arrays: Vec<ArrayRef> = (0..result.columns.len())
        .map(|idx| {
            let cells: StringArray = result
                .values
                .iter()
                .map(|row| row.get(idx).filter(|v| !v.is_null()).map(|v| v.to_string()))
                .collect();
            Arc::new(cells) as ArrayRef
        })
        .collect();
    let batch = RecordBatch::try_new(schema, arrays).context("building CSV batch")?;

    let mut writer = WriterBuilder::new().with_header(true).build(Vec::new());
    writer.write(&batch).context("writing CSV")?;
    String::from_utf8(writer.into_inner()).context("CSV output is not UTF-8")
}

pub fn render_json(results: &[ResultSet]) -> Result<String> {
    serde_json::to_string_pretty(results).context("serializing results as JSON")
}

/// Render every result set, one after another.
pub fn render_results(results: &[ResultSet], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => render_json(results),
        OutputFormat::Table => Ok(results
            .iter()
            .map(render_table)
            .collect::<Vec<_>>()
            .join("\n")),
        OutputFormat::Csv => Ok(results
            .iter()
            .map(render_csv)
            .collect::<Result<Vec<_>>>()?
            .join("\n")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResultSet {
        ResultSet::new(
            vec!["county".into(), "cases".into()],
            vec![
                vec![Value::Text("King".into()), Value::Integer(1200)],
                vec![Value::Text("Snohomish".into()), Value::Null],
            ],
        )
    }

    #[test]
    fn table_right_aligns_numbers_and_blanks_nulls() {
        let text = render_table(&sample());
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines.iter().any(|l| l.contains("county") && l.contains("cases")));

        let king = lines.iter().find(|l| l.contains("King")).unwrap();
        assert!(king.contains("|  1200 |"), "{}", king);

        let sno = lines.iter().find(|l| l.contains("Snohomish")).unwrap();
        assert!(!sno.contains("NULL"));
        assert!(sno.trim_end().ends_with("|       |"), "{}", sno);
        assert_eq!(lines.last().copied(), Some("(2 rows)"));
    }

    #[test]
    fn csv_quotes_when_needed() -> Result<()> {
        let rs = ResultSet::new(
            vec!["name".into()],
            vec![vec![Value::Text("King, \"WA\"".into())]],
        );
        assert_eq!(render_csv(&rs)?, "name\n\"King, \"\"WA\"\"\"\n");
        Ok(())
    }

    #[test]
    fn csv_leaves_nulls_empty() -> Result<()> {
        assert_eq!(render_csv(&sample())?, "county,cases\nKing,1200\nSnohomish,\n");
        Ok(())
    }

    #[test]
    fn json_keeps_types() -> Result<()> {
        let json = render_results(&[sample()], OutputFormat::Json)?;
        let parsed: serde_json::Value = serde_json::from_str(&json)?;
        assert_eq!(parsed[0]["values"][0][1], serde_json::json!(1200));
        assert!(parsed[0]["values"][1][1].is_null());
        Ok(())
    }

    #[test]
    fn empty_result_still_has_header() {
        let rs = ResultSet::new(vec!["a".into()], vec![]);
        let text = render_table(&rs);
        assert!(text.lines().next().unwrap_or_default().contains('a'));
        assert!(text.ends_with("(0 rows)\n"));
    }

    #[test]
    fn format_parsing() {
        assert_eq!("CSV".parse::<OutputFormat>().ok(), Some(OutputFormat::Csv));
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
