use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use covidsql::{
    config::{ChartArgs, DatasetArgs},
    debounce::{Debouncer, Generations, Ticket, DEFAULT_DEBOUNCE},
    explorer::{command::HELP, Command, Explorer, QueryBuffer},
    logging,
    render::{render_results, OutputFormat},
};
use reqwest::Client;
use std::{
    fs,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing::{debug, error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "covidsql")]
#[command(about = "Explore the NYT county-level COVID-19 dataset with SQL")]
struct Args {
    #[command(flatten)]
    dataset: DatasetArgs,

    #[command(flatten)]
    chart: ChartArgs,

    /// Output format for result sets
    #[arg(long, env = "COVIDSQL_FORMAT", default_value = "table")]
    format: OutputFormat,

    /// Quiet period before typed SQL runs, in milliseconds
    #[arg(long, env = "COVIDSQL_DEBOUNCE_MS", default_value_t = DEFAULT_DEBOUNCE.as_millis() as u64)]
    debounce_ms: u64,

    /// Show the starting view once and exit instead of prompting
    #[arg(long)]
    batch: bool,
}

/// Everything the prompt mutates.
struct Shell {
    explorer: Explorer,
    format: OutputFormat,
    svg: Option<PathBuf>,
    chart: ChartArgs,
}

type SharedShell = Arc<Mutex<Shell>>;

impl Shell {
    fn present(&self) -> Result<()> {
        let Some(outcome) = self.explorer.outcome() else {
            return Ok(());
        };
        if let Some(err) = &outcome.err {
            println!("Error: {}", err);
            return Ok(());
        }
        if !outcome.results.is_empty() {
            println!("{}", render_results(&outcome.results, self.format)?);
        }
        self.write_chart()
    }

    fn write_chart(&self) -> Result<()> {
        let spec = self.chart.spec(self.explorer.view().chart);
        let Some(chart) = self.explorer.chart(spec)? else {
            return Ok(());
        };
        match &self.svg {
            Some(path) => {
                fs::write(path, chart.to_svg())
                    .with_context(|| format!("writing chart to {}", path.display()))?;
                info!(path = %path.display(), points = chart.point_count(), "chart written");
            }
            None => warn!("chart view selected but no SVG path; use --svg or :svg PATH"),
        }
        Ok(())
    }

    fn apply(&mut self, cmd: Command) -> Result<()> {
        let mut filters = self.explorer.view().filters.clone();
        match cmd {
            Command::State(state) => filters.set_state(state),
            Command::County(county) => {
                if county.is_some() && filters.state.is_none() {
                    bail!("pick a state first (:state NAME)");
                }
                filters.set_county(county)
            }
            Command::Metric(metric) => filters.metric = metric,
            Command::Since(since) => filters.since = since,
            Command::Until(until) => filters.until = until,
            Command::Chart(kind) => {
                self.explorer.set_chart(kind);
                return self.write_chart();
            }
            Command::Svg(path) => {
                self.svg = Some(path);
                return self.write_chart();
            }
            Command::Format(format) => {
                self.format = format;
                return Ok(());
            }
            Command::States => {
                println!("{}", self.explorer.state_options()?.join("\n"));
                return Ok(());
            }
            Command::Counties => {
                let state = filters
                    .state
                    .as_deref()
                    .ok_or_else(|| anyhow!("pick a state first (:state NAME)"))?;
                println!("{}", self.explorer.county_options(state)?.join("\n"));
                return Ok(());
            }
            Command::View => {
                let view = self.explorer.view().to_query_string();
                println!("{}", if view.is_empty() { "(empty view)" } else { view.as_str() });
                return Ok(());
            }
            Command::Clear | Command::Help | Command::Quit => return Ok(()),
        }
        self.explorer.apply_filters(filters);
        self.present()
    }
}

/// Run `f` against the shell on the blocking pool; engine calls are synchronous.
async fn with_shell<R, F>(shell: &SharedShell, f: F) -> Result<R>
where
    R: Send + 'static,
    F: FnOnce(&mut Shell) -> Result<R> + Send + 'static,
{
    let shell = shell.clone();
    tokio::task::spawn_blocking(move || {
        let mut guard = shell.lock().map_err(|_| anyhow!("shell state poisoned"))?;
        f(&mut guard)
    })
    .await
    .context("shell task panicked")?
}

/// Execute debounced queries, dropping any that were superseded before or
/// while they ran.
async fn run_tickets(
    shell: SharedShell,
    generations: Generations,
    mut tickets: mpsc::UnboundedReceiver<Ticket<String>>,
) {
    while let Some(ticket) = tickets.recv().await {
        let generations = generations.clone();
        let result = with_shell(&shell, move |sh| {
            if !generations.is_current(ticket.generation) {
                debug!(generation = ticket.generation, "skipping superseded query");
                return Ok(());
            }
            let outcome = sh.explorer.run(&ticket.value);
            if !generations.is_current(ticket.generation) {
                debug!(generation = ticket.generation, "discarding superseded result");
                return Ok(());
            }
            sh.explorer.commit(outcome, true);
            sh.present()
        })
        .await;
        if let Err(e) = result {
            error!("{:#}", e);
        }
    }
}

async fn prompt(shell: SharedShell, debounce: Duration) -> Result<()> {
    let (debouncer, tickets) = Debouncer::spawn(debounce);
    let runner = tokio::spawn(run_tickets(shell.clone(), debouncer.generations(), tickets));

    let mut buffer = QueryBuffer::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        match Command::parse(&line) {
            None => {
                if line.trim().is_empty() && buffer.is_empty() {
                    continue;
                }
                let text = buffer.push_line(&line).to_string();
                debouncer.submit(text);
            }
            Some(Err(e)) => eprintln!("{:#}", e),
            Some(Ok(Command::Quit)) => break,
            Some(Ok(Command::Help)) => println!("{}", HELP),
            Some(Ok(Command::Clear)) => {
                buffer.clear();
                debouncer.supersede();
            }
            Some(Ok(cmd)) => {
                if cmd.supersedes_query() {
                    debouncer.supersede();
                }
                if let Err(e) = with_shell(&shell, move |sh| sh.apply(cmd)).await {
                    eprintln!("Error: {:#}", e);
                }
            }
        }
    }

    debouncer.close().await;
    runner.await.context("query runner panicked")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.dataset.debug);

    let source = args.dataset.data_source()?;
    let mut view = args.dataset.initial_view()?;
    if let Some(kind) = args.chart.chart {
        view.chart = kind;
    }

    let client = Client::new();
    let explorer = Explorer::load(&client, &source, args.dataset.load_options(), view).await?;
    info!(rows = explorer.stats().rows, "ready");

    let shell = Shell {
        explorer,
        format: args.format,
        svg: args.chart.svg.clone(),
        chart: args.chart.clone(),
    };

    if args.batch {
        let mut shell = shell;
        if shell.explorer.outcome().is_none() {
            let sql = shell.explorer.view().effective_sql();
            shell.explorer.exec(&sql, false);
        }
        shell.present()?;
        if let Some(err) = shell.explorer.outcome().and_then(|o| o.err.clone()) {
            bail!("query failed: {}", err);
        }
        return Ok(());
    }

    let shell = Arc::new(Mutex::new(shell));
    {
        let guard = shell.lock().map_err(|_| anyhow!("shell state poisoned"))?;
        guard.present()?;
    }
    eprintln!("covid_counties is loaded. Type SQL, or :help for commands.");
    prompt(shell, Duration::from_millis(args.debounce_ms)).await
}
