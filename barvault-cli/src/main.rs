//! BarVault CLI — fetch, inspect and export daily price history.
//!
//! Commands:
//! - `fetch` — plan and fetch one or more symbols into the local store
//! - `info` — summary and gap report for one stored symbol
//! - `list` — every stored symbol with its summary
//! - `export` — write a stored series to CSV
//! - `registry import` / `registry list` — manage ticker reference data

use anyhow::{bail, Context, Result};
use barvault_core::config::AppConfig;
use barvault_core::data::{CircuitBreaker, TickerRegistry, TickerStore, TiingoSource};
use barvault_core::domain::{normalize_symbol, DateRange};
use barvault_core::planner::PlanMode;
use barvault_runner::report::{list_summaries, report_json};
use barvault_runner::{export_series, inspect, StdoutProgress, UpdateOptions, Updater};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "barvault",
    about = "BarVault — daily OHLCV history fetcher and Parquet store"
)]
struct Cli {
    /// TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides config and BARVAULT_DATA_DIR).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Debug logging.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch daily bars for one or more symbols.
    Fetch {
        /// Symbols to fetch (e.g., SPY QQQ AAPL).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Start date (YYYY-MM-DD). Defaults to all available history.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to the latest available bar.
        #[arg(long)]
        end: Option<String>,

        /// Extend stored series (tail fetch), or re-fetch history if gaps are found.
        #[arg(long, default_value_t = false)]
        update: bool,

        /// Re-fetch even if data is already stored.
        #[arg(long, default_value_t = false)]
        force: bool,

        /// Maximum simultaneous fetches (overrides config).
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Show the summary and gap report for a stored symbol.
    Info {
        symbol: String,

        /// Print the report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List stored symbols.
    List,
    /// Export a stored series to CSV.
    Export {
        symbol: String,

        /// Output file.
        #[arg(long)]
        out: PathBuf,
    },
    /// Ticker registry commands.
    Registry {
        #[command(subcommand)]
        action: RegistryAction,
    },
}

#[derive(Subcommand)]
enum RegistryAction {
    /// Import entries from a CSV file with columns symbol,name,exchange,sector.
    Import { file: PathBuf },
    /// List registered tickers.
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    debug!(data_dir = %config.data_dir.display(), "configuration loaded");

    match cli.command {
        Commands::Fetch {
            symbols,
            start,
            end,
            update,
            force,
            concurrency,
        } => {
            if let Some(n) = concurrency {
                if n == 0 {
                    bail!("--concurrency must be at least 1");
                }
                config.max_concurrency = n;
            }
            let range = DateRange::new(parse_date(start.as_deref())?, parse_date(end.as_deref())?);
            run_fetch(&config, symbols, range, PlanMode { update, force })
        }
        Commands::Info { symbol, json } => run_info(&config, &symbol, json),
        Commands::List => run_list(&config),
        Commands::Export { symbol, out } => run_export(&config, &symbol, &out),
        Commands::Registry { action } => match action {
            RegistryAction::Import { file } => run_registry_import(&config, &file),
            RegistryAction::List => run_registry_list(&config),
        },
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "barvault=debug" } else { "barvault=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn parse_date(s: Option<&str>) -> Result<Option<NaiveDate>> {
    s.map(|s| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
    })
    .transpose()
}

fn run_fetch(
    config: &AppConfig,
    symbols: Vec<String>,
    range: DateRange,
    mode: PlanMode,
) -> Result<()> {
    if let (Some(start), Some(end)) = (range.start, range.end) {
        if start > end {
            bail!("--start {start} is after --end {end}");
        }
    }

    let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
    let source = TiingoSource::new(config, circuit_breaker)?;
    let store = TickerStore::new(&config.data_dir);
    let registry_path = config.registry_path();
    let registry = Mutex::new(TickerRegistry::load(&registry_path)?);

    let today = chrono::Local::now().date_naive();
    let options = UpdateOptions::from_config(config, range, mode, today);
    let report = Updater::new(&source, &store)
        .with_registry(&registry)
        .run(&symbols, &options, &StdoutProgress)?;

    if !report.registered.is_empty() {
        let registry = registry
            .into_inner()
            .map_err(|_| anyhow::anyhow!("registry lock poisoned"))?;
        if let Err(e) = registry.save(&registry_path) {
            eprintln!("Warning: failed to save registry: {e}");
        }
    }

    if report.has_failures() {
        for r in report.results.iter().filter(|r| r.outcome.is_failure()) {
            eprintln!("Error for {}: {}", r.symbol, r.outcome);
        }
        std::process::exit(1);
    }

    Ok(())
}

fn run_info(config: &AppConfig, symbol: &str, json: bool) -> Result<()> {
    let symbol = normalize_symbol(symbol);
    let store = TickerStore::new(&config.data_dir);
    let Some(report) = inspect(&store, &symbol, config.significant_gap_days)? else {
        bail!("no stored data for {symbol}");
    };

    if json {
        println!("{}", report_json(&report)?);
        return Ok(());
    }

    let s = &report.summary;
    println!("Symbol:       {}", s.symbol);
    println!("Source:       {}", s.source);
    println!("Records:      {}", s.record_count);
    println!("First date:   {}", s.first_date);
    println!("Last date:    {}", s.last_date);
    println!("Last update:  {}", s.last_update.format("%Y-%m-%d %H:%M:%S"));
    println!();
    println!(
        "Gaps: {} total ({} missing trading days), {} significant (> {} days)",
        report.gaps.len(),
        report.missing_days(),
        report.significant_gaps.len(),
        report.significant_threshold
    );
    if !report.gaps.is_empty() {
        println!();
        println!("{:<12} {:<12} {:>6}  {}", "Start", "End", "Days", "");
        println!("{}", "-".repeat(44));
        for g in &report.gaps {
            let flag = if g.is_significant(report.significant_threshold) {
                "significant"
            } else {
                ""
            };
            println!("{:<12} {:<12} {:>6}  {flag}", g.start.to_string(), g.end.to_string(), g.days);
        }
    }

    Ok(())
}

fn run_list(config: &AppConfig) -> Result<()> {
    let store = TickerStore::new(&config.data_dir);
    let rows = list_summaries(&store)?;
    if rows.is_empty() {
        println!("No stored symbols in {}", config.data_dir.display());
        return Ok(());
    }

    println!("{:<10} {:<25} {:>8}  {:<20}", "Symbol", "Date Range", "Bars", "Last Update");
    println!("{}", "-".repeat(67));
    for (symbol, summary) in rows {
        match summary {
            Ok(Some(s)) => println!(
                "{:<10} {:<25} {:>8}  {:<20}",
                symbol,
                format!("{} to {}", s.first_date, s.last_date),
                s.record_count,
                s.last_update.format("%Y-%m-%d %H:%M").to_string()
            ),
            Ok(None) => println!("{symbol:<10} (empty)"),
            Err(e) => println!("{symbol:<10} (unreadable: {e})"),
        }
    }

    Ok(())
}

fn run_export(config: &AppConfig, symbol: &str, out: &std::path::Path) -> Result<()> {
    let symbol = normalize_symbol(symbol);
    let store = TickerStore::new(&config.data_dir);
    let rows = export_series(&store, &symbol, out)?;
    println!("Exported {rows} rows for {symbol} to {}", out.display());
    Ok(())
}

fn run_registry_import(config: &AppConfig, file: &std::path::Path) -> Result<()> {
    let path = config.registry_path();
    let mut registry = TickerRegistry::load(&path)?;
    let now = chrono::Utc::now().naive_utc();
    let count = registry.import_csv(file, now)?;
    registry.save(&path)?;
    println!("Imported {count} entries ({} registered)", registry.len());
    Ok(())
}

fn run_registry_list(config: &AppConfig) -> Result<()> {
    let registry = TickerRegistry::load(&config.registry_path())?;
    if registry.is_empty() {
        println!("Registry is empty");
        return Ok(());
    }

    println!("{:<10} {:<12} {:<20} {}", "Symbol", "Exchange", "Sector", "Name");
    println!("{}", "-".repeat(70));
    for m in registry.list() {
        println!(
            "{:<10} {:<12} {:<20} {}",
            m.symbol,
            m.exchange,
            m.sector.as_deref().unwrap_or("-"),
            m.name
        );
    }
    Ok(())
}
