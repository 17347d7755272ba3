use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use covidsql::{
    chart::ChartKind,
    config::{ChartArgs, DatasetArgs},
    explorer::Explorer,
    logging,
};
use reqwest::Client;
use std::fs;
use tracing::info;

/// Render one view of the dataset to an SVG file and exit.
#[derive(Parser, Debug)]
#[command(name = "covidsql-chart")]
struct Args {
    #[command(flatten)]
    dataset: DatasetArgs,

    #[command(flatten)]
    chart: ChartArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.dataset.debug);

    let Some(path) = args.chart.svg.clone() else {
        bail!("--svg PATH is required");
    };

    let mut view = args.dataset.initial_view()?;
    view.chart = match args.chart.chart {
        Some(kind) => kind,
        None if view.chart.is_chart() => view.chart,
        None => ChartKind::Line,
    };
    if !view.chart.is_chart() {
        bail!("--chart table has nothing to draw");
    }

    let source = args.dataset.data_source()?;
    let mut explorer =
        Explorer::load(&Client::new(), &source, args.dataset.load_options(), view).await?;
    if explorer.outcome().is_none() {
        let sql = explorer.view().effective_sql();
        explorer.exec(&sql, false);
    }
    if let Some(err) = explorer.outcome().and_then(|o| o.err.clone()) {
        bail!("query failed: {}", err);
    }

    let chart = explorer
        .chart(args.chart.spec(explorer.view().chart))?
        .ok_or_else(|| anyhow!("query returned no result set to chart"))?;
    fs::write(&path, chart.to_svg()).with_context(|| format!("writing {}", path.display()))?;
    info!(
        path = %path.display(),
        series = chart.series.len(),
        points = chart.point_count(),
        view = %explorer.view().to_query_string(),
        "chart written"
    );
    Ok(())
}
