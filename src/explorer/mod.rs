// src/explorer/mod.rs
//
// Application state: the loaded database, the current view state and the
// outcome of the last run.

pub mod command;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::chart::{Chart, ChartKind, ChartSpec};
use crate::db::{self, Database, LoadOptions, LoadStats, ResultSet};
use crate::fetch::{fetch_dataset, DataSource};
use crate::view::{county_options_sql, state_options_sql, Filters, ViewState};

pub use command::{Command, QueryBuffer};

/// Result of running one batch of SQL. Exactly one of the two is meaningful.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Outcome {
    pub sql: String,
    pub results: Vec<ResultSet>,
    pub err: Option<String>,
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        self.err.is_none()
    }
}

pub struct Explorer {
    db: Database,
    view: ViewState,
    outcome: Option<Outcome>,
    stats: LoadStats,
}

impl Explorer {
    /// Fetch `source`, load it into a fresh table and apply `view`.
    pub async fn load(
        client: &Client,
        source: &DataSource,
        options: LoadOptions,
        view: ViewState,
    ) -> Result<Self> {
        info!(%source, "loading dataset");
        let bytes = fetch_dataset(client, source).await?;
        tokio::task::spawn_blocking(move || Explorer::from_csv(&bytes, &options, view))
            .await
            .context("loader task panicked")?
    }

    /// Build from an in-memory CSV body. Runs the view's query, if any.
    pub fn from_csv(bytes: &[u8], options: &LoadOptions, view: ViewState) -> Result<Self> {
        let db = Database::open_in_memory()?;
        db::reset_table(&db)?;
        let stats = db::load_csv(&db, bytes, options)?;

        let mut explorer = Self {
            db,
            view,
            outcome: None,
            stats,
        };
        if explorer.view.has_selection() {
            let sql = explorer.view.effective_sql();
            debug!(sql = %sql, "running initial view");
            explorer.exec(&sql, false);
        }
        Ok(explorer)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }

    /// Run `sql` without touching any state.
    pub fn run(&self, sql: &str) -> Outcome {
        match self.db.exec(sql) {
            Ok(results) => Outcome {
                sql: sql.to_string(),
                results,
                err: None,
            },
            Err(e) => {
                warn!(error = %e, "query failed");
                Outcome {
                    sql: sql.to_string(),
                    results: Vec::new(),
                    err: Some(format!("{:#}", e)),
                }
            }
        }
    }

    /// Store an outcome. With `set_view` the SQL becomes the view's query,
    /// whether or not it succeeded.
    pub fn commit(&mut self, outcome: Outcome, set_view: bool) -> &Outcome {
        if set_view {
            let q = outcome.sql.trim();
            self.view.query = if q.is_empty() { None } else { Some(q.to_string()) };
        }
        self.outcome.insert(outcome)
    }

    pub fn exec(&mut self, sql: &str, set_view: bool) -> &Outcome {
        let outcome = self.run(sql);
        self.commit(outcome, set_view)
    }

    /// Replace the filter selection, drop any explicit query and rerun.
    pub fn apply_filters(&mut self, filters: Filters) -> &Outcome {
        self.view.filters = filters;
        self.view.query = None;
        let sql = self.view.filters.to_sql();
        self.exec(&sql, false)
    }

    pub fn set_chart(&mut self, kind: ChartKind) {
        self.view.chart = kind;
    }

    pub fn state_options(&self) -> Result<Vec<String>> {
        self.db.column_strings(&state_options_sql())
    }

    pub fn county_options(&self, state: &str) -> Result<Vec<String>> {
        self.db.column_strings(&county_options_sql(state))
    }

    /// Chart the last result set of the current outcome, if the view wants a chart.
    pub fn chart(&self, mut spec: ChartSpec) -> Result<Option<Chart>> {
        if !self.view.chart.is_chart() {
            return Ok(None);
        }
        let Some(result) = self
            .outcome
            .as_ref()
            .filter(|o| o.is_ok())
            .and_then(|o| o.results.last())
        else {
            return Ok(None);
        };
        spec.kind = self.view.chart;
        Chart::from_result(result, spec).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Value;
    use crate::view::Metric;

    const CSV: &str = "date,county,state,fips,cases,deaths
2020-03-01,King,Washington,53033,10,1
2020-03-02,King,Washington,53033,20,2
2020-03-01,Snohomish,Washington,53061,5,0
2020-03-02,Snohomish,Washington,53061,7,1
2020-03-02,Cook,Illinois,17031,3,0
";

    fn explorer(view: ViewState) -> Result<Explorer> {
        Explorer::from_csv(CSV.as_bytes(), &LoadOptions::default(), view)
    }

    #[test]
    fn fresh_explorer_has_nothing_to_show() -> Result<()> {
        let ex = explorer(ViewState::default())?;
        assert!(ex.outcome().is_none());
        assert_eq!(ex.stats().rows, 5);
        Ok(())
    }

    #[test]
    fn view_query_runs_after_load() -> Result<()> {
        let ex = explorer(ViewState::with_query(
            "SELECT COUNT(*) AS n FROM covid_counties",
        ))?;
        let outcome = ex.outcome().unwrap();
        assert!(outcome.is_ok());
        assert_eq!(outcome.results[0].values[0][0], Value::Integer(5));
        Ok(())
    }

    #[test]
    fn exec_records_query_in_view_even_on_error() -> Result<()> {
        let mut ex = explorer(ViewState::default())?;
        let outcome = ex.exec("SELECT nope FROM covid_counties", true).clone();
        assert!(!outcome.is_ok());
        assert!(outcome.results.is_empty());
        assert_eq!(
            ex.view().to_query_string(),
            "?q=SELECT+nope+FROM+covid_counties"
        );

        // a good query clears the error
        let outcome = ex.exec("SELECT 1", false);
        assert!(outcome.is_ok());
        Ok(())
    }

    #[test]
    fn filters_rebuild_the_query() -> Result<()> {
        let mut ex = explorer(ViewState::with_query("SELECT 1"))?;
        let filters = Filters {
            state: Some("Washington".into()),
            metric: Metric::Deaths,
            ..Default::default()
        };
        let outcome = ex.apply_filters(filters).clone();
        assert_eq!(ex.view().query, None);
        assert_eq!(outcome.results[0].columns, vec!["date", "deaths"]);
        assert_eq!(
            outcome.results[0].values,
            vec![
                vec![Value::Text("2020-03-01".into()), Value::Integer(1)],
                vec![Value::Text("2020-03-02".into()), Value::Integer(3)],
            ]
        );
        Ok(())
    }

    #[test]
    fn dropdown_options() -> Result<()> {
        let ex = explorer(ViewState::default())?;
        assert_eq!(ex.state_options()?, vec!["Illinois", "Washington"]);
        assert_eq!(ex.county_options("Washington")?, vec!["King", "Snohomish"]);
        assert!(ex.county_options("Atlantis")?.is_empty());
        Ok(())
    }

    #[test]
    fn chart_follows_view_kind() -> Result<()> {
        let view = ViewState::from_query_string("?chart=line")?;
        let mut ex = explorer(view)?;
        // nothing run yet
        assert!(ex.chart(ChartSpec::new(ChartKind::Line))?.is_none());

        ex.apply_filters(Filters::default());
        let chart = ex.chart(ChartSpec::new(ChartKind::Bar))?.unwrap();
        assert_eq!(chart.spec.kind, ChartKind::Line);
        assert_eq!(chart.series[0].points.len(), 2);

        ex.set_chart(ChartKind::Table);
        assert!(ex.chart(ChartSpec::new(ChartKind::Line))?.is_none());
        Ok(())
    }
}
