// src/explorer/command.rs
use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;
use std::path::PathBuf;

use crate::chart::ChartKind;
use crate::render::OutputFormat;
use crate::view::{parse_date, Metric};

pub const HELP: &str = "\
Type SQL; it runs once you stop typing. A line ending in `;` completes a query.
  :state [NAME]       pick a state (no name clears it)
  :county [NAME]      pick a county within the state
  :metric cases|deaths
  :since [DATE]       first day to include (YYYY-MM-DD)
  :until [DATE]       last day to include
  :chart table|line|bar
  :svg PATH           write charts to PATH
  :format table|csv|json
  :states             list states
  :counties           list counties of the selected state
  :view               print the shareable view string
  :clear              discard the query being typed
  :help               this text
  :quit               exit";

/// A `:`-prefixed prompt command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    State(Option<String>),
    County(Option<String>),
    Metric(Metric),
    Since(Option<NaiveDate>),
    Until(Option<NaiveDate>),
    Chart(ChartKind),
    Svg(PathBuf),
    Format(OutputFormat),
    States,
    Counties,
    View,
    Clear,
    Help,
    Quit,
}

fn optional(arg: &str) -> Option<String> {
    let arg = arg.trim();
    if arg.is_empty() {
        None
    } else {
        Some(arg.to_string())
    }
}

fn required<'a>(name: &str, arg: &'a str) -> Result<&'a str> {
    let arg = arg.trim();
    if arg.is_empty() {
        bail!(":{} needs an argument", name);
    }
    Ok(arg)
}

impl Command {
    /// Parse a prompt line. Returns `None` for plain SQL input.
    pub fn parse(line: &str) -> Option<Result<Command>> {
        let rest = line.trim().strip_prefix(':')?;
        let (name, arg) = rest
            .split_once(char::is_whitespace)
            .unwrap_or((rest, ""));
        let name = name.to_ascii_lowercase();
        Some(Self::from_parts(&name, arg))
    }

    /// Commands that replace what is shown, making a pending query stale.
    /// Read-only commands leave it alone.
    pub fn supersedes_query(&self) -> bool {
        matches!(
            self,
            Command::State(_)
                | Command::County(_)
                | Command::Metric(_)
                | Command::Since(_)
                | Command::Until(_)
                | Command::Chart(_)
                | Command::Clear
        )
    }

    fn from_parts(name: &str, arg: &str) -> Result<Command> {
        Ok(match name {
            "state" => Command::State(optional(arg)),
            "county" => Command::County(optional(arg)),
            "metric" => Command::Metric(required(name, arg)?.parse()?),
            "since" => Command::Since(optional(arg).map(|d| parse_date(&d)).transpose()?),
            "until" => Command::Until(optional(arg).map(|d| parse_date(&d)).transpose()?),
            "chart" => Command::Chart(required(name, arg)?.parse()?),
            "svg" => Command::Svg(PathBuf::from(required(name, arg)?)),
            "format" => Command::Format(required(name, arg)?.parse()?),
            "states" => Command::States,
            "counties" => Command::Counties,
            "view" => Command::View,
            "clear" => Command::Clear,
            "help" | "h" | "?" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            other => return Err(anyhow!("unknown command `:{}` (try :help)", other)),
        })
    }
}

/// The text being typed, line by line, like the contents of a text area.
/// A line ending in `;` completes the query; the next line starts afresh.
#[derive(Clone, Debug, Default)]
pub struct QueryBuffer {
    text: String,
    complete: bool,
}

impl QueryBuffer {
    /// Append a line and return the whole query as it stands.
    pub fn push_line(&mut self, line: &str) -> &str {
        if self.complete {
            self.text.clear();
            self.complete = false;
        }
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        self.text.push_str(line.trim_end());
        self.complete = self.text.trim_end().ends_with(';');
        &self.text
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.complete = false;
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_sql_is_not_a_command() {
        assert!(Command::parse("SELECT 1;").is_none());
        assert!(Command::parse("").is_none());
    }

    #[test]
    fn parses_commands_with_arguments() -> Result<()> {
        assert_eq!(
            Command::parse(":state  New York ").unwrap()?,
            Command::State(Some("New York".into()))
        );
        assert_eq!(Command::parse(":state").unwrap()?, Command::State(None));
        assert_eq!(
            Command::parse(":METRIC deaths").unwrap()?,
            Command::Metric(Metric::Deaths)
        );
        assert_eq!(
            Command::parse(":since 2020-04-01").unwrap()?,
            Command::Since(NaiveDate::from_ymd_opt(2020, 4, 1))
        );
        assert_eq!(Command::parse(":until").unwrap()?, Command::Until(None));
        assert_eq!(Command::parse(":chart bar").unwrap()?, Command::Chart(ChartKind::Bar));
        assert_eq!(
            Command::parse(":svg out/chart.svg").unwrap()?,
            Command::Svg(PathBuf::from("out/chart.svg"))
        );
        assert_eq!(Command::parse(":q").unwrap()?, Command::Quit);
        Ok(())
    }

    #[test]
    fn rejects_bad_commands() {
        assert!(Command::parse(":frobnicate").unwrap().is_err());
        assert!(Command::parse(":chart").unwrap().is_err());
        assert!(Command::parse(":metric recovered").unwrap().is_err());
        assert!(Command::parse(":since soon").unwrap().is_err());
    }

    #[test]
    fn only_view_changes_supersede_pending_sql() -> Result<()> {
        for line in [
            ":state Ohio",
            ":county",
            ":metric deaths",
            ":since",
            ":until",
            ":chart line",
            ":clear",
        ] {
            assert!(Command::parse(line).unwrap()?.supersedes_query(), "{}", line);
        }
        for line in [
            ":view",
            ":states",
            ":counties",
            ":format csv",
            ":svg out.svg",
            ":help",
        ] {
            assert!(!Command::parse(line).unwrap()?.supersedes_query(), "{}", line);
        }
        Ok(())
    }

    #[test]
    fn buffer_accumulates_until_semicolon() {
        let mut buf = QueryBuffer::default();
        assert_eq!(buf.push_line("SELECT *"), "SELECT *");
        assert_eq!(
            buf.push_line("FROM covid_counties;  "),
            "SELECT *\nFROM covid_counties;"
        );
        // next line starts a new query
        assert_eq!(buf.push_line("SELECT 1"), "SELECT 1");
        buf.clear();
        assert!(buf.is_empty());
    }
}
