// src/view/mod.rs
//
// The shareable part of the explorer: current query, filter selections and
// chart kind, encoded as a URL query string (`?q=...&state=...`).

pub mod filters;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::form_urlencoded;

use crate::chart::ChartKind;
pub use filters::{county_options_sql, parse_date, state_options_sql, Filters, Metric};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    /// Explicit SQL typed by the user; wins over the filters.
    pub query: Option<String>,
    pub filters: Filters,
    pub chart: ChartKind,
}

impl ViewState {
    pub fn with_query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Default::default()
        }
    }

    /// True when there is something to run on startup.
    pub fn has_selection(&self) -> bool {
        self.query.is_some() || !self.filters.is_default()
    }

    /// SQL the view currently stands for.
    pub fn effective_sql(&self) -> String {
        match &self.query {
            Some(q) => q.clone(),
            None => self.filters.to_sql(),
        }
    }

    /// Encode as `?key=value&...`, omitting defaults. Empty view encodes to "".
    pub fn to_query_string(&self) -> String {
        let mut ser = form_urlencoded::Serializer::new(String::new());
        if let Some(q) = &self.query {
            ser.append_pair("q", q);
        }
        let f = &self.filters;
        if let Some(state) = &f.state {
            ser.append_pair("state", state);
        }
        if let Some(county) = &f.county {
            ser.append_pair("county", county);
        }
        if f.metric != Metric::default() {
            ser.append_pair("metric", f.metric.as_str());
        }
        if let Some(since) = f.since {
            ser.append_pair("since", &since.format("%Y-%m-%d").to_string());
        }
        if let Some(until) = f.until {
            ser.append_pair("until", &until.format("%Y-%m-%d").to_string());
        }
        if self.chart != ChartKind::default() {
            ser.append_pair("chart", self.chart.as_str());
        }
        let encoded = ser.finish();
        if encoded.is_empty() {
            encoded
        } else {
            format!("?{}", encoded)
        }
    }

    /// Parse a query string, with or without the leading `?`. Unknown keys are
    /// ignored; malformed metric, chart or date values are errors.
    pub fn from_query_string(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let raw = raw.strip_prefix('?').unwrap_or(raw);
        let mut view = ViewState::default();
        let mut state = None;
        let mut county = None;

        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            match key.as_ref() {
                "q" => {
                    view.query = Some(value.into_owned()).filter(|q| !q.trim().is_empty());
                }
                "state" => state = Some(value.into_owned()),
                "county" => county = Some(value.into_owned()),
                "metric" => view.filters.metric = value.parse().context("view parameter `metric`")?,
                "since" => view.filters.since = Some(parse_date(&value)?),
                "until" => view.filters.until = Some(parse_date(&value)?),
                "chart" => view.chart = value.parse().context("view parameter `chart`")?,
                other => debug!(key = other, "ignoring unknown view parameter"),
            }
        }
        view.filters.set_state(state);
        view.filters.set_county(county);
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_view_encodes_to_nothing() {
        assert_eq!(ViewState::default().to_query_string(), "");
        assert!(!ViewState::default().has_selection());
    }

    #[test]
    fn query_is_percent_encoded() -> Result<()> {
        let view = ViewState::with_query("SELECT * FROM covid_counties WHERE state = 'Ohio';");
        let encoded = view.to_query_string();
        assert!(encoded.starts_with("?q=SELECT+*+FROM"));
        assert!(!encoded.contains('\''));
        assert_eq!(ViewState::from_query_string(&encoded)?, view);
        Ok(())
    }

    #[test]
    fn accepts_browser_style_encoding() -> Result<()> {
        // encodeURIComponent output, %20 for spaces
        let view = ViewState::from_query_string("q=SELECT%20COUNT(*)%20FROM%20covid_counties%3B")?;
        assert_eq!(view.query.as_deref(), Some("SELECT COUNT(*) FROM covid_counties;"));
        Ok(())
    }

    #[test]
    fn filters_and_chart_round_out_the_view() -> Result<()> {
        let view = ViewState::from_query_string(
            "?state=New+York&county=New%20York%20City&metric=deaths&since=2020-03-01&chart=line&utm=x",
        )?;
        assert_eq!(view.query, None);
        assert_eq!(view.filters.state.as_deref(), Some("New York"));
        assert_eq!(view.filters.county.as_deref(), Some("New York City"));
        assert_eq!(view.filters.metric, Metric::Deaths);
        assert_eq!(view.chart, ChartKind::Line);
        assert!(view.has_selection());
        assert!(view.effective_sql().contains("SUM(deaths)"));

        let again = ViewState::from_query_string(&view.to_query_string())?;
        assert_eq!(again, view);
        Ok(())
    }

    #[test]
    fn query_wins_over_filters() -> Result<()> {
        let view = ViewState::from_query_string("?q=SELECT+1&state=Ohio")?;
        assert_eq!(view.effective_sql(), "SELECT 1");
        Ok(())
    }

    #[test]
    fn rejects_bad_values() {
        assert!(ViewState::from_query_string("metric=recovered").is_err());
        assert!(ViewState::from_query_string("chart=pie").is_err());
        assert!(ViewState::from_query_string("since=yesterday").is_err());
    }

    #[test]
    fn blank_query_counts_as_none() -> Result<()> {
        assert_eq!(ViewState::from_query_string("?q=++")?.query, None);
        Ok(())
    }
}
