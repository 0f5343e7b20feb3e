use analysts::registry_from_config;
use anyhow::{Context, bail};
use backtester::{BacktestReport, Backtester};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use comfy_table::Table;
use configuration::{AnalystId, Config, init_tracing, load_config};
use engine::{DecisionPipeline, LiveEngine};
use executor::{PaperBroker, Portfolio};
use market_data::{FallbackMarketData, InMemoryMarketData, MarketData};
use std::path::PathBuf;
use std::sync::Arc;

/// The main entry point for the Council application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A .env file is optional; COUNCIL_* variables may also come from the shell.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_dir.as_deref()).context("failed to initialise logging")?;

    let mut config = load_config(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;

    match cli.command {
        Commands::Backtest(args) => handle_backtest(args, &mut config).await,
        Commands::Live(args) => handle_live(args, &mut config).await,
        Commands::Report(args) => handle_report(args),
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// A multi-analyst portfolio decision engine with a built-in backtester.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Also write daily-rolling log files to this directory.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay the decision pipeline over historical prices.
    Backtest(BacktestArgs),
    /// Run a single decision cycle and place paper orders.
    Live(LiveArgs),
    /// Print a saved backtest report.
    Report(ReportArgs),
}

#[derive(Parser)]
struct DataArgs {
    /// JSON price file: {"AAPL": [{"date": "2024-01-02", "close": 185.64}]}.
    #[arg(long)]
    prices: PathBuf,

    /// Secondary price file consulted when the primary has no data.
    #[arg(long)]
    fallback_prices: Option<PathBuf>,

    /// Instruments to trade (comma separated). Defaults to every instrument in the price file.
    #[arg(long, value_delimiter = ',')]
    instruments: Vec<String>,

    /// Analysts to consult, overriding `analysts.enabled` in the config.
    #[arg(long, value_enum, value_delimiter = ',')]
    analysts: Vec<AnalystId>,
}

#[derive(Parser)]
struct BacktestArgs {
    #[command(flatten)]
    data: DataArgs,

    /// The first trading date (format: YYYY-MM-DD).
    #[arg(long)]
    from: NaiveDate,

    /// The last trading date (format: YYYY-MM-DD).
    #[arg(long)]
    to: NaiveDate,

    /// Write the full report as JSON to this path.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Hide the progress bar.
    #[arg(long)]
    quiet: bool,
}

#[derive(Parser)]
struct LiveArgs {
    #[command(flatten)]
    data: DataArgs,

    /// The date to decide for (format: YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    as_of: Option<NaiveDate>,
}

#[derive(Parser)]
struct ReportArgs {
    /// A report written by `backtest --output`.
    path: PathBuf,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_backtest(args: BacktestArgs, config: &mut Config) -> anyhow::Result<()> {
    let pipeline = build_pipeline(&args.data, config)?;
    let backtester = Backtester::new(config, pipeline)?.with_progress(!args.quiet);

    let report = backtester
        .run(args.from, args.to)
        .await
        .context("backtest failed")?;

    print_report(&report);
    if let Some(path) = &args.output {
        report.save_json(path)?;
        println!("Report written to {}", path.display());
    }
    Ok(())
}

async fn handle_live(args: LiveArgs, config: &mut Config) -> anyhow::Result<()> {
    let as_of = args
        .as_of
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let pipeline = build_pipeline(&args.data, config)?;
    let portfolio = Portfolio::new(
        config.simulation.initial_cash,
        config.simulation.margin_requirement,
    )?;
    let broker = Arc::new(PaperBroker::new());
    let mut engine = LiveEngine::new(pipeline, broker, portfolio);

    let cycle = engine
        .run_cycle(as_of)
        .await
        .with_context(|| format!("decision cycle for {} failed", as_of))?;

    let mut table = Table::new();
    table.set_header(vec!["Instrument", "Action", "Quantity", "Confidence", "Rationale"]);
    for decision in cycle.outcome.decisions.values() {
        table.add_row(vec![
            decision.instrument.clone(),
            decision.action.to_string(),
            decision.quantity.to_string(),
            decision.confidence.round_dp(3).to_string(),
            decision.rationale.clone(),
        ]);
    }
    println!("Decisions for {}", as_of);
    println!("{table}");

    let gapped: Vec<&String> = engine
        .instruments()
        .iter()
        .filter(|instrument| !cycle.outcome.prices.contains_key(*instrument))
        .collect();
    if !gapped.is_empty() {
        println!("No price on {} for: {:?}", as_of, gapped);
    }
    println!("{} paper order(s) placed.", cycle.tickets.len());
    Ok(())
}

fn handle_report(args: ReportArgs) -> anyhow::Result<()> {
    let report = BacktestReport::load_json(&args.path)
        .with_context(|| format!("failed to read report {}", args.path.display()))?;
    print_report(&report);
    Ok(())
}

// ==============================================================================
// Wiring
// ==============================================================================

fn load_market_data(data: &DataArgs) -> anyhow::Result<(Arc<dyn MarketData>, Vec<String>)> {
    let primary = InMemoryMarketData::from_json_file(&data.prices)
        .with_context(|| format!("failed to load prices from {}", data.prices.display()))?;
    let known: Vec<String> = primary.instruments().map(str::to_string).collect();

    let market_data: Arc<dyn MarketData> = match &data.fallback_prices {
        Some(path) => {
            let fallback = InMemoryMarketData::from_json_file(path)
                .with_context(|| format!("failed to load fallback prices from {}", path.display()))?;
            Arc::new(FallbackMarketData::new(Arc::new(primary), Arc::new(fallback)))
        }
        None => Arc::new(primary),
    };
    Ok((market_data, known))
}

fn build_pipeline(data: &DataArgs, config: &mut Config) -> anyhow::Result<DecisionPipeline> {
    if !data.analysts.is_empty() {
        config.analysts.enabled = data.analysts.clone();
    }
    let (market_data, known) = load_market_data(data)?;
    let instruments = if data.instruments.is_empty() {
        known
    } else {
        data.instruments.clone()
    };
    if instruments.is_empty() {
        bail!("no instruments to trade in {}", data.prices.display());
    }

    let registry = registry_from_config(config, market_data.clone())?;
    tracing::info!(analysts = ?registry, ?instruments, "pipeline assembled");
    Ok(DecisionPipeline::new(config, instruments, registry, market_data)?)
}

// ==============================================================================
// Output
// ==============================================================================

fn print_report(report: &BacktestReport) {
    let metrics = &report.metrics;
    let ratio = |value: Option<f64>| value.map_or_else(|| "n/a".to_string(), |v| format!("{:.3}", v));

    let mut summary = Table::new();
    summary.set_header(vec!["Metric", "Value"]);
    summary.add_row(vec!["Period".to_string(), format!("{} to {}", report.start, report.end)]);
    summary.add_row(vec!["Instruments".to_string(), report.instruments.join(", ")]);
    summary.add_row(vec!["Initial cash".to_string(), report.initial_cash.round_dp(2).to_string()]);
    summary.add_row(vec!["Final value".to_string(), report.final_value.round_dp(2).to_string()]);
    summary.add_row(vec![
        "Total return".to_string(),
        format!("{}%", (metrics.total_return * rust_decimal::Decimal::ONE_HUNDRED).round_dp(2)),
    ]);
    summary.add_row(vec![
        "Max drawdown".to_string(),
        format!("{}%", (metrics.max_drawdown * rust_decimal::Decimal::ONE_HUNDRED).round_dp(2)),
    ]);
    summary.add_row(vec!["Sharpe ratio".to_string(), ratio(metrics.sharpe_ratio)]);
    summary.add_row(vec!["Sortino ratio".to_string(), ratio(metrics.sortino_ratio)]);
    summary.add_row(vec![
        "Annualized volatility".to_string(),
        ratio(metrics.annualized_volatility),
    ]);
    summary.add_row(vec!["Trading days".to_string(), report.history.len().to_string()]);
    summary.add_row(vec!["Fills".to_string(), report.trades.iter().filter(|t| t.filled > 0).count().to_string()]);
    println!("{summary}");

    let mut positions = Table::new();
    positions.set_header(vec!["Instrument", "Long", "Short", "Realized P&L"]);
    for position in report.final_portfolio.positions.iter().filter(|p| !p.is_flat() || !p.realized_gains().is_zero()) {
        positions.add_row(vec![
            position.instrument().to_string(),
            position.long_shares().to_string(),
            position.short_shares().to_string(),
            position.realized_gains().round_dp(2).to_string(),
        ]);
    }
    println!("{positions}");
}

