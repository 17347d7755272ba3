// src/config.rs
//
// Command-line/environment configuration shared by the binaries.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::chart::{ChartKind, ChartSpec};
use crate::db::LoadOptions;
use crate::fetch::{DataSource, DEFAULT_DATASET_URL};
use crate::view::ViewState;

#[derive(Args, Debug, Clone)]
pub struct DatasetArgs {
    /// CSV to load: an http(s) URL or a local path
    #[arg(long, env = "COVIDSQL_SOURCE", default_value = DEFAULT_DATASET_URL)]
    pub source: String,

    /// Rows appended per chunk while loading
    #[arg(long, env = "COVIDSQL_CHUNK_ROWS", default_value_t = 100)]
    pub chunk_rows: usize,

    /// View string to start from, e.g. `?state=Ohio&chart=line`
    #[arg(long, env = "COVIDSQL_VIEW")]
    pub view: Option<String>,

    /// SQL to run; overrides any query in --view
    #[arg(short, long)]
    pub query: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}

impl DatasetArgs {
    pub fn data_source(&self) -> Result<DataSource> {
        DataSource::parse(&self.source)
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            chunk_rows: self.chunk_rows.max(1),
        }
    }

    /// Starting view: `--view` first, then `--query` on top.
    pub fn initial_view(&self) -> Result<ViewState> {
        let mut view = match &self.view {
            Some(raw) => ViewState::from_query_string(raw)?,
            None => ViewState::default(),
        };
        if let Some(q) = &self.query {
            view.query = Some(q.clone());
        }
        Ok(view)
    }
}

#[derive(Args, Debug, Clone)]
pub struct ChartArgs {
    /// Chart kind; overrides the view's
    #[arg(long)]
    pub chart: Option<ChartKind>,

    /// File to write chart SVG to
    #[arg(long, env = "COVIDSQL_SVG")]
    pub svg: Option<PathBuf>,

    /// Column for the x axis (default: first column)
    #[arg(long)]
    pub x: Option<String>,

    /// Columns to plot (default: every numeric column)
    #[arg(long, value_delimiter = ',')]
    pub y: Vec<String>,

    #[arg(long, default_value_t = 960.0)]
    pub width: f64,

    #[arg(long, default_value_t = 500.0)]
    pub height: f64,
}

impl ChartArgs {
    pub fn spec(&self, kind: ChartKind) -> ChartSpec {
        let mut spec = ChartSpec::new(kind);
        spec.x = self.x.clone();
        spec.y = self.y.clone();
        spec.width = self.width.max(100.0);
        spec.height = self.height.max(100.0);
        spec
    }
}
