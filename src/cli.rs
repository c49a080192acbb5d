//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::account::Account;
use crate::domain::allocator::NaiveAllocator;
use crate::domain::analysis::AnalysisSummary;
use crate::domain::backtest::Backtest;
use crate::domain::config_validation::{parse_date, validate_config};
use crate::domain::error::TradesimError;
use crate::domain::history::AccountHistory;
use crate::domain::indicator::ClosePriceIndicator;
use crate::domain::rule::{ConstantRule, SignalRule};
use crate::domain::strategy::Strategy;
use crate::domain::universe::{parse_codes, validate_alignment, Universe};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_MAX_SINGLE_POSITION: Decimal = dec!(0.5);
pub const DEFAULT_MAX_TOTAL_POSITION: Decimal = dec!(0.95);

#[derive(Parser, Debug)]
#[command(name = "tradesim", about = "Tick-driven trading strategy simulator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory for report files, overrides [report] output_dir
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        exchange: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a backtest configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for symbol(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        exchange: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Csv,
}

impl ReportFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "json" => Some(ReportFormat::Json),
            "csv" => Some(ReportFormat::Csv),
            _ => None,
        }
    }

    pub fn writer(self) -> Box<dyn ReportPort> {
        match self {
            ReportFormat::Json => Box::new(JsonReportAdapter::new()),
            ReportFormat::Csv => Box::new(CsvReportAdapter::new()),
        }
    }
}

/// Everything a backtest run needs, resolved from the config file and the
/// command line overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestSettings {
    pub initial_capital: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub universe: Universe,
    pub data_dir: PathBuf,
    pub benchmark: Option<String>,
    pub max_single_position: Decimal,
    pub max_total_position: Decimal,
    pub fresh_entries_only: bool,
    pub report_format: ReportFormat,
    pub output_dir: PathBuf,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            output,
            code,
            exchange,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config, code.as_deref(), exchange.as_deref())
            } else {
                run_backtest(
                    &config,
                    output.as_ref(),
                    code.as_deref(),
                    exchange.as_deref(),
                )
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::Info {
            config,
            code,
            exchange,
        } => run_info(&config, code.as_deref(), exchange.as_deref()),
    }
}

fn fail(err: TradesimError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(fail)
}

fn run_backtest(
    config_path: &PathBuf,
    output_path: Option<&PathBuf>,
    code_override: Option<&str>,
    exchange_override: Option<&str>,
) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Validate
    if let Err(e) = validate_config(&adapter) {
        return fail(e);
    }

    // Stage 3: Resolve settings
    let mut settings = match build_backtest_settings(&adapter, code_override, exchange_override) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    if let Some(dir) = output_path {
        settings.output_dir = dir.clone();
    }

    eprintln!(
        "Loading {} codes on {} from {}",
        settings.universe.count(),
        settings.universe.exchange,
        settings.data_dir.display()
    );

    // Stages 4-6: Load data, simulate, analyse
    let data_port = CsvAdapter::new(settings.data_dir.clone());
    let history = match run_backtest_pipeline(&data_port, &settings) {
        Ok(h) => h,
        Err(e) => return fail(e),
    };

    let Some(summary) = history.summary() else {
        return fail(TradesimError::Data {
            reason: "backtest produced no snapshots".to_string(),
        });
    };
    print_summary(&summary);

    // Stage 7: Write reports
    let writer = settings.report_format.writer();
    match write_reports(&history, &summary, writer.as_ref(), &settings.output_dir) {
        Ok(paths) => {
            eprintln!();
            for path in &paths {
                eprintln!("Report written to: {}", path.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

pub fn build_backtest_settings(
    adapter: &dyn ConfigPort,
    code_override: Option<&str>,
    exchange_override: Option<&str>,
) -> Result<BacktestSettings, TradesimError> {
    let start_date = parse_date(
        adapter.get_string("backtest", "start_date").as_deref(),
        "start_date",
    )?;
    let end_date = parse_date(
        adapter.get_string("backtest", "end_date").as_deref(),
        "end_date",
    )?;

    let codes = resolve_codes(code_override, adapter)?;
    let exchange = match exchange_override {
        Some(e) => e.trim().to_string(),
        None => adapter
            .get_string("backtest", "exchange")
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| TradesimError::ConfigMissing {
                section: "backtest".into(),
                key: "exchange".into(),
            })?,
    };

    // A benchmark outside an overridden code list has no prices to follow.
    let benchmark = adapter
        .get_string("backtest", "benchmark")
        .map(|b| b.trim().to_uppercase())
        .filter(|b| !b.is_empty() && codes.contains(b));

    let format_str = adapter
        .get_string("report", "format")
        .unwrap_or_else(|| "json".to_string());
    let report_format =
        ReportFormat::parse(&format_str).ok_or_else(|| TradesimError::ConfigInvalid {
            section: "report".into(),
            key: "format".into(),
            reason: format!("unknown report format '{}'", format_str),
        })?;

    Ok(BacktestSettings {
        initial_capital: adapter.get_decimal("backtest", "initial_capital", Decimal::ZERO),
        start_date,
        end_date,
        universe: Universe { codes, exchange },
        data_dir: PathBuf::from(
            adapter
                .get_string("backtest", "data_dir")
                .unwrap_or_else(|| "data".to_string()),
        ),
        benchmark,
        max_single_position: adapter.get_decimal(
            "allocator",
            "max_single_position",
            DEFAULT_MAX_SINGLE_POSITION,
        ),
        max_total_position: adapter.get_decimal(
            "allocator",
            "max_total_position",
            DEFAULT_MAX_TOTAL_POSITION,
        ),
        fresh_entries_only: adapter.get_bool("allocator", "fresh_entries_only", false),
        report_format,
        output_dir: PathBuf::from(
            adapter
                .get_string("report", "output_dir")
                .unwrap_or_else(|| ".".to_string()),
        ),
    })
}

/// Load one strategy per code. Codes with a signal column follow it; codes
/// without one are held for the whole run.
pub fn load_strategies(
    data_port: &dyn DataPort,
    settings: &BacktestSettings,
) -> Result<Vec<Strategy>, TradesimError> {
    let exchange = &settings.universe.exchange;
    let mut strategies = Vec::with_capacity(settings.universe.count());

    for code in &settings.universe.codes {
        let (series, signals) = data_port.fetch_series_with_signals(
            code,
            exchange,
            settings.start_date,
            settings.end_date,
        )?;
        if series.is_empty() {
            return Err(TradesimError::NoData {
                code: code.clone(),
                exchange: exchange.clone(),
            });
        }

        let close = ClosePriceIndicator::new(&series);
        let strategy = match signals {
            Some(signals) => {
                debug!(code = %code, bars = series.len(), "following signal column");
                Strategy::new(code.clone(), series, SignalRule::new(signals))
            }
            None => {
                debug!(code = %code, bars = series.len(), "no signals, holding");
                Strategy::new(code.clone(), series, ConstantRule(true))
            }
        };
        strategies.push(strategy.with_indicator("close", close));
    }

    Ok(strategies)
}

pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    settings: &BacktestSettings,
) -> Result<AccountHistory, TradesimError> {
    // Stage 4: Load and align data
    let strategies = load_strategies(data_port, settings)?;
    validate_alignment(&strategies)?;

    // Stage 5: Simulate
    let ticks = strategies.first().map(|s| s.series.len()).unwrap_or(0);
    eprintln!(
        "Running backtest: {} codes, {} to {}",
        strategies.len(),
        settings.start_date,
        settings.end_date
    );
    eprintln!("  Processing: {} ticks", ticks);

    let allocator = NaiveAllocator::new(settings.max_single_position, settings.max_total_position);
    let mut backtest = Backtest::new(
        strategies,
        Box::new(allocator),
        Account::with_cash(settings.initial_capital),
    )?;
    if settings.fresh_entries_only {
        backtest = backtest.with_account_aware_allocation();
    }
    if let Some(benchmark) = &settings.benchmark {
        backtest = backtest.with_benchmark(benchmark.clone());
    }

    backtest.run()?;
    info!(snapshots = backtest.history().len(), "simulation finished");
    Ok(backtest.into_history())
}

/// Write the snapshot, summary and monthly return files into `output_dir`,
/// returning the paths written.
pub fn write_reports(
    history: &AccountHistory,
    summary: &AnalysisSummary,
    writer: &dyn ReportPort,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, TradesimError> {
    let ext = writer.extension();
    let snapshots = output_dir.join(format!("snapshots.{ext}"));
    let summary_path = output_dir.join(format!("summary.{ext}"));
    let monthly = output_dir.join(format!("monthly_returns.{ext}"));

    writer.write_snapshots(history, &snapshots.to_string_lossy())?;
    writer.write_summary(summary, &summary_path.to_string_lossy())?;
    writer.write_monthly_returns(&history.monthly_percent_gains(), &monthly.to_string_lossy())?;

    Ok(vec![snapshots, summary_path, monthly])
}

fn print_summary(summary: &AnalysisSummary) {
    eprintln!("\n=== Results ===");
    eprintln!(
        "Period:           {} to {}",
        summary.start.date_naive(),
        summary.end.date_naive()
    );
    eprintln!("Starting Equity:  {:.2}", summary.starting_equity);
    eprintln!("Ending Equity:    {:.2}", summary.ending_equity);
    eprintln!("Total Profit:     {:.2}", summary.total_profit);
    eprintln!("Total Return:     {:.2}%", summary.percent_gain);
    eprintln!("Annualized:       {:.2}%", summary.annualized_return);
    eprintln!("Volatility:       {:.2}%", summary.annualized_volatility);
    eprintln!("Max Drawdown:     -{:.1}%", summary.max_drawdown);

    if let Some(benchmark) = &summary.benchmark {
        eprintln!("\n=== Benchmark ({}) ===", benchmark);
        eprintln!("Buy & Hold:       {:.2}%", summary.benchmark_percent_gain);
        eprintln!("Buy & Hold P/L:   {:.2}", summary.benchmark_total_profit);
    }
}

fn run_dry_run(
    config_path: &PathBuf,
    code_override: Option<&str>,
    exchange_override: Option<&str>,
) -> ExitCode {
    eprintln!("Dry run: validating config {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_config(&adapter) {
        return fail(e);
    }

    let settings = match build_backtest_settings(&adapter, code_override, exchange_override) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    eprintln!("\nBacktest:");
    eprintln!("  Initial capital: {}", settings.initial_capital);
    eprintln!(
        "  Date range:      {} to {}",
        settings.start_date, settings.end_date
    );
    eprintln!("  Data directory:  {}", settings.data_dir.display());
    if let Some(benchmark) = &settings.benchmark {
        eprintln!("  Benchmark:       {}", benchmark);
    }

    eprintln!("\nUniverse:");
    eprintln!("  Exchange: {}", settings.universe.exchange);
    eprintln!(
        "  Codes ({}): {}",
        settings.universe.count(),
        settings.universe.codes.join(", ")
    );

    eprintln!("\nAllocator:");
    eprintln!("  Max single position: {}", settings.max_single_position);
    eprintln!("  Max total position:  {}", settings.max_total_position);
    eprintln!("  Fresh entries only:  {}", settings.fresh_entries_only);

    eprintln!("\nReport:");
    eprintln!("  Format:     {:?}", settings.report_format);
    eprintln!("  Output dir: {}", settings.output_dir.display());

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    match validate_config(&adapter) {
        Ok(()) => {
            eprintln!("Configuration is valid.");
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_info(config_path: &PathBuf, code: Option<&str>, exchange: Option<&str>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let codes = match resolve_codes(code, &config) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let exchange = match exchange {
        Some(e) => e.to_string(),
        None => match config.get_string("backtest", "exchange") {
            Some(e) => e.trim().to_string(),
            None => {
                return fail(TradesimError::ConfigMissing {
                    section: "backtest".into(),
                    key: "exchange".into(),
                })
            }
        },
    };
    let data_dir = config
        .get_string("backtest", "data_dir")
        .unwrap_or_else(|| "data".to_string());

    let adapter = CsvAdapter::new(PathBuf::from(data_dir));
    for c in &codes {
        match adapter.get_data_range(c, &exchange) {
            Ok(Some((min_date, max_date, count))) => {
                println!(
                    "{}.{}: {} bars, {} to {}",
                    c, exchange, count, min_date, max_date
                );
            }
            Ok(None) => {
                eprintln!("{}.{}: no data found", c, exchange);
            }
            Err(e) => {
                eprintln!("error querying {}.{}: {}", c, exchange, e);
            }
        }
    }
    ExitCode::SUCCESS
}

/// Codes from `--code` when given, otherwise the configured list.
pub fn resolve_codes(
    code_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<String>, TradesimError> {
    let (raw, key) = match code_override {
        Some(c) => (c.to_string(), "code"),
        None => match config.get_string("backtest", "codes") {
            Some(c) => (c, "codes"),
            None => {
                return Err(TradesimError::ConfigMissing {
                    section: "backtest".into(),
                    key: "codes".into(),
                })
            }
        },
    };

    parse_codes(&raw).map_err(|e| TradesimError::ConfigInvalid {
        section: "backtest".into(),
        key: key.into(),
        reason: e.to_string(),
    })
}
