//! CLI definition and dispatch.

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};

use crate::adapters::csv_adapter::{read_series_file, read_values_file, CsvAdapter, ValueSeries};
use crate::adapters::csv_report_adapter::{write_drawdown, CsvReportAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::text_summary::{format_drawdown, format_summary};
use crate::domain::backtest::{run_backtest, BacktestConfig, BacktestRun};
use crate::domain::config_validation::{
    build_backtest_config, validate_backtest_config, validate_data_config,
};
use crate::domain::drawdown::{calculate_drawdowns, DrawdownReport, SeriesKind};
use crate::domain::error::TradesimError;
use crate::domain::execution::Sizing;
use crate::domain::metrics::{period_returns, BacktestSummary};
use crate::domain::ohlcv::{validate_series, PriceBar};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

const DEFAULT_DATA_DIR: &str = "data";

#[derive(Parser, Debug)]
#[command(name = "tradesim", about = "Signal-driven single-asset backtester")]
pub struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest over a signal-annotated series
    Backtest {
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Series CSV file
        #[arg(short, long, conflicts_with = "ticker")]
        input: Option<PathBuf>,
        /// Load every stored session of a ticker
        #[arg(long)]
        ticker: Option<String>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Directory for equity, trade and drawdown reports
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        initial_cash: Option<f64>,
        #[arg(long)]
        fee: Option<f64>,
        /// fractional or whole
        #[arg(long)]
        sizing: Option<String>,
        #[arg(long)]
        no_validate_timestamps: bool,
    },
    /// Drawdown analysis of a timestamp,value series
    Drawdown {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long, value_enum, default_value_t = ValueKind::Returns)]
        kind: ValueKind,
        /// Write the per-point drawdown series to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Store a series CSV into the dated data directory
    Store {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long)]
        ticker: String,
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

/// How the `value` column of a drawdown input is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ValueKind {
    /// Period returns, compounded before analysis
    Returns,
    /// Already-cumulative values such as an equity curve
    Cumulative,
    /// Price levels, converted to period returns first
    Prices,
}

/// Command-line values that take precedence over `[backtest]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BacktestOverrides {
    pub initial_cash: Option<f64>,
    pub fee: Option<f64>,
    pub sizing: Option<String>,
    pub validate_timestamps: Option<bool>,
}

/// Where the price series comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    File(PathBuf),
    Ticker { ticker: String, base_dir: PathBuf },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            input,
            ticker,
            data_dir,
            output,
            initial_cash,
            fee,
            sizing,
            no_validate_timestamps,
        } => {
            let overrides = BacktestOverrides {
                initial_cash,
                fee,
                sizing,
                validate_timestamps: no_validate_timestamps.then_some(false),
            };
            run_backtest_command(
                config.as_deref(),
                input,
                ticker,
                data_dir,
                output,
                &overrides,
            )
        }
        Command::Drawdown {
            input,
            kind,
            output,
        } => run_drawdown_command(&input, kind, output.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Store {
            input,
            ticker,
            data_dir,
        } => run_store(&input, &ticker, data_dir),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, TradesimError> {
    FileConfigAdapter::from_file(path).map_err(|e| TradesimError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Build the engine configuration from an optional config file plus overrides.
pub fn resolve_backtest_config(
    config: Option<&dyn ConfigPort>,
    overrides: &BacktestOverrides,
) -> Result<BacktestConfig, TradesimError> {
    let mut resolved = match config {
        Some(c) => build_backtest_config(c)?,
        None => BacktestConfig::default(),
    };

    if let Some(cash) = overrides.initial_cash {
        resolved.initial_cash = cash;
    }
    if let Some(fee) = overrides.fee {
        resolved.fee = fee;
    }
    if let Some(ref sizing) = overrides.sizing {
        resolved.sizing = sizing.parse::<Sizing>()?;
    }
    if let Some(check) = overrides.validate_timestamps {
        resolved.validate_timestamps = check;
    }

    resolved.validate()?;
    Ok(resolved)
}

/// Pick the data source; command-line flags win over `[data]`.
pub fn resolve_data_source(
    input: Option<PathBuf>,
    ticker: Option<String>,
    data_dir: Option<PathBuf>,
    config: Option<&dyn ConfigPort>,
) -> Result<DataSource, TradesimError> {
    let configured_dir = || {
        config
            .and_then(|c| c.get_string("data", "base_dir"))
            .map(PathBuf::from)
    };

    if let Some(path) = input {
        return Ok(DataSource::File(path));
    }
    if let Some(ticker) = ticker {
        let base_dir = data_dir
            .or_else(configured_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        return Ok(DataSource::Ticker { ticker, base_dir });
    }

    let config = config.ok_or_else(|| TradesimError::ConfigMissing {
        section: "data".to_string(),
        key: "input".to_string(),
    })?;
    validate_data_config(config)?;

    match config
        .get_string("data", "input")
        .filter(|s| !s.trim().is_empty())
    {
        Some(path) => Ok(DataSource::File(PathBuf::from(path.trim()))),
        None => {
            let ticker = config
                .get_string("data", "ticker")
                .map(|t| t.trim().to_string())
                .unwrap_or_default();
            let base_dir = data_dir
                .or_else(configured_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
            Ok(DataSource::Ticker { ticker, base_dir })
        }
    }
}

/// Run the engine and summarize the result.
pub fn execute_backtest(
    bars: &[PriceBar],
    config: &BacktestConfig,
) -> Result<(BacktestRun, BacktestSummary), TradesimError> {
    let run = run_backtest(bars, config)?;
    let summary = BacktestSummary::compute(&run)?;
    Ok((run, summary))
}

/// Load a ticker through any data port and run it.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    ticker: &str,
    config: &BacktestConfig,
) -> Result<(BacktestRun, BacktestSummary), TradesimError> {
    let bars = data_port.load_series(ticker)?;
    execute_backtest(&bars, config)
}

fn run_backtest_command(
    config_path: Option<&Path>,
    input: Option<PathBuf>,
    ticker: Option<String>,
    data_dir: Option<PathBuf>,
    output: Option<PathBuf>,
    overrides: &BacktestOverrides,
) -> Result<(), TradesimError> {
    let adapter = match config_path {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            Some(load_config(path)?)
        }
        None => None,
    };
    let config = adapter.as_ref().map(|a| a as &dyn ConfigPort);

    let bt_config = resolve_backtest_config(config, overrides)?;
    debug!(?bt_config, "resolved backtest config");

    let source = resolve_data_source(input, ticker, data_dir, config)?;
    let (run, summary) = match &source {
        DataSource::File(path) => {
            info!(path = %path.display(), "reading series");
            execute_backtest(&read_series_file(path)?, &bt_config)?
        }
        DataSource::Ticker { ticker, base_dir } => {
            run_backtest_pipeline(&CsvAdapter::new(base_dir.clone()), ticker, &bt_config)?
        }
    };

    print!("{}", format_summary(&summary));

    let output_dir = output.or_else(|| {
        config
            .and_then(|c| c.get_string("output", "dir"))
            .map(PathBuf::from)
    });
    if let Some(dir) = output_dir {
        CsvReportAdapter.write(&run, &summary, &dir.display().to_string())?;
        eprintln!("Reports written to {}", dir.display());
    }

    Ok(())
}

/// Drawdown analysis of a value series under the given interpretation.
pub fn analyze_values(
    series: &ValueSeries,
    kind: ValueKind,
) -> Result<DrawdownReport, TradesimError> {
    let timestamps = series.timestamps.as_deref();
    match kind {
        ValueKind::Returns => calculate_drawdowns(&series.values, timestamps, SeriesKind::Returns),
        ValueKind::Cumulative => {
            calculate_drawdowns(&series.values, timestamps, SeriesKind::Cumulative)
        }
        ValueKind::Prices => {
            if series.values.len() < 2 {
                return Err(TradesimError::invalid_input(
                    "price series needs at least two values",
                ));
            }
            let returns = period_returns(&series.values);
            calculate_drawdowns(&returns, timestamps.map(|t| &t[1..]), SeriesKind::Returns)
        }
    }
}

fn run_drawdown_command(
    input: &Path,
    kind: ValueKind,
    output: Option<&Path>,
) -> Result<(), TradesimError> {
    let series = read_values_file(input)?;
    info!(path = %input.display(), values = series.values.len(), ?kind, "analyzing drawdown");

    let report = analyze_values(&series, kind)?;
    print!("{}", format_drawdown(&report));

    if let Some(path) = output {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        write_drawdown(fs::File::create(path)?, &report)?;
        eprintln!("Drawdown series written to {}", path.display());
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), TradesimError> {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = load_config(config_path)?;

    validate_backtest_config(&adapter)?;
    validate_data_config(&adapter)?;
    let bt_config = build_backtest_config(&adapter)?;

    eprintln!("  initial_cash:        {}", bt_config.initial_cash);
    eprintln!("  fee:                 {}", bt_config.fee);
    eprintln!("  sizing:              {}", bt_config.sizing);
    eprintln!("  validate_timestamps: {}", bt_config.validate_timestamps);
    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn run_store(input: &Path, ticker: &str, data_dir: Option<PathBuf>) -> Result<(), TradesimError> {
    let bars = read_series_file(input)?;
    validate_series(&bars, true)?;

    let adapter = CsvAdapter::new(data_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)));
    if adapter.store_series(ticker, &bars)? {
        eprintln!("Stored {} bars for {}", bars.len(), ticker);
    } else {
        eprintln!("Session for {} already stored, nothing written", ticker);
    }
    Ok(())
}
