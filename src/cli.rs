//! CLI definition and dispatch.
//!
//! The CLI owns all I/O: it loads configuration, builds a price source,
//! hands the materialised series to the engine and prints the outcome.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

use crate::adapters::csv_price_source::CsvPriceSource;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestResult};
use crate::domain::config_validation::{validate_backtest_config, DEFAULT_LIMIT};
use crate::domain::error::EthSignalError;
use crate::domain::features::{FeatureExtractor, DEFAULT_WINDOW};
use crate::domain::price::PriceSeries;
use crate::domain::sentiment::{self, SentimentReport};
use crate::domain::strategy::{
    StrategyKind, StrategyParams, DEFAULT_LONG_WINDOW, DEFAULT_SHORT_WINDOW,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::price_source::{PriceSource, SourceKind};
use crate::ports::report_port::ReportPort;

pub const DEFAULT_SYMBOL: &str = "ETHUSDT";
pub const DEFAULT_INTERVAL: &str = "1d";

#[derive(Parser, Debug)]
#[command(name = "ethsignal", about = "ETH/USDT trading-signal backtester")]
pub struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DataArgs {
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// csv, binance or coinmarketcap
    #[arg(long)]
    pub source: Option<SourceKind>,
    /// CSV file to read prices from (implies --source csv)
    #[arg(long)]
    pub csv: Option<PathBuf>,
    #[arg(long)]
    pub symbol: Option<String>,
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest over historical prices
    Backtest {
        #[command(flatten)]
        data: DataArgs,
        /// volatility, crossover or sentiment
        #[arg(long)]
        strategy: Option<StrategyKind>,
        #[arg(long)]
        window: Option<usize>,
        #[arg(long)]
        short_window: Option<usize>,
        #[arg(long)]
        long_window: Option<usize>,
        #[arg(long)]
        initial_cash: Option<f64>,
        /// Write the per-period step series as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the simulated sentiment for the latest period
    Sentiment {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Overrides for [`BacktestConfig`] taken from the command line.
#[derive(Debug, Clone, Default)]
pub struct BacktestOverrides {
    pub strategy: Option<StrategyKind>,
    pub window: Option<usize>,
    pub short_window: Option<usize>,
    pub long_window: Option<usize>,
    pub initial_cash: Option<f64>,
}

/// Where and how to fetch prices.
#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    pub source: SourceKind,
    pub symbol: String,
    pub interval: String,
    pub limit: usize,
    pub path: Option<PathBuf>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub convert: String,
}

pub fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    // a subscriber may already be installed (tests)
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging(cli.verbose);

    let outcome = match cli.command {
        Command::Backtest {
            data,
            strategy,
            window,
            short_window,
            long_window,
            initial_cash,
            output,
        } => {
            let overrides = BacktestOverrides {
                strategy,
                window,
                short_window,
                long_window,
                initial_cash,
            };
            run_backtest(&data, &overrides, output.as_deref())
        }
        Command::Sentiment { data } => run_sentiment(&data),
        Command::Validate { config } => run_validate(&config),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, EthSignalError> {
    match path {
        Some(p) => {
            info!("Loading config from {}", p.display());
            FileConfigAdapter::from_file(p)
        }
        None => Ok(FileConfigAdapter::empty()),
    }
}

fn get_usize(config: &dyn ConfigPort, section: &str, key: &str, default: usize) -> usize {
    let value = config.get_int(section, key, default as i64);
    usize::try_from(value).unwrap_or(0)
}

pub fn build_backtest_config(
    config: &dyn ConfigPort,
    overrides: &BacktestOverrides,
) -> Result<BacktestConfig, EthSignalError> {
    let kind = match overrides.strategy {
        Some(kind) => kind,
        None => match config.get_nonempty("backtest", "strategy") {
            Some(s) => s.parse()?,
            None => StrategyKind::default(),
        },
    };

    let strategy = StrategyParams {
        kind,
        window: overrides
            .window
            .unwrap_or_else(|| get_usize(config, "backtest", "window", DEFAULT_WINDOW)),
        short_window: overrides.short_window.unwrap_or_else(|| {
            get_usize(config, "backtest", "short_window", DEFAULT_SHORT_WINDOW)
        }),
        long_window: overrides.long_window.unwrap_or_else(|| {
            get_usize(config, "backtest", "long_window", DEFAULT_LONG_WINDOW)
        }),
    };

    Ok(BacktestConfig {
        initial_cash: overrides.initial_cash.unwrap_or_else(|| {
            config.get_double(
                "backtest",
                "initial_cash",
                backtest_engine::DEFAULT_INITIAL_CASH,
            )
        }),
        strategy,
    })
}

pub fn build_data_config(
    config: &dyn ConfigPort,
    args: &DataArgs,
) -> Result<DataConfig, EthSignalError> {
    let path = args
        .csv
        .clone()
        .or_else(|| config.get_nonempty("data", "path").map(PathBuf::from));

    let source = match (args.source, &args.csv) {
        (Some(kind), _) => kind,
        (None, Some(_)) => SourceKind::Csv,
        (None, None) => match config.get_nonempty("data", "source") {
            Some(s) => s.parse()?,
            None => SourceKind::default(),
        },
    };

    if source == SourceKind::Csv && path.is_none() {
        return Err(EthSignalError::ConfigMissing {
            section: "data".into(),
            key: "path".into(),
        });
    }

    let limit = args
        .limit
        .unwrap_or_else(|| get_usize(config, "data", "limit", DEFAULT_LIMIT as usize));
    if limit == 0 {
        return Err(EthSignalError::ConfigInvalid {
            section: "data".into(),
            key: "limit".into(),
            reason: "limit must be at least 1".into(),
        });
    }

    let api_key = config.get_nonempty("data", "api_key").or_else(|| {
        std::env::var("CMC_PRO_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
    });

    Ok(DataConfig {
        source,
        symbol: args
            .symbol
            .clone()
            .or_else(|| config.get_nonempty("data", "symbol"))
            .unwrap_or_else(|| DEFAULT_SYMBOL.to_string()),
        interval: config
            .get_nonempty("data", "interval")
            .unwrap_or_else(|| DEFAULT_INTERVAL.to_string()),
        limit,
        path,
        api_key,
        base_url: config.get_nonempty("data", "base_url"),
        convert: config
            .get_nonempty("data", "convert")
            .unwrap_or_else(|| "USDT".to_string()),
    })
}

pub fn build_price_source(data: &DataConfig) -> Result<Box<dyn PriceSource>, EthSignalError> {
    match data.source {
        SourceKind::Csv => {
            let path = data.path.clone().ok_or_else(|| EthSignalError::ConfigMissing {
                section: "data".into(),
                key: "path".into(),
            })?;
            Ok(Box::new(CsvPriceSource::new(path)))
        }
        #[cfg(feature = "http")]
        SourceKind::Binance => {
            use crate::adapters::binance::{BinancePriceSource, DEFAULT_BASE_URL};
            let base = data.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
            Ok(Box::new(BinancePriceSource::new(base, &data.interval)?))
        }
        #[cfg(feature = "http")]
        SourceKind::CoinMarketCap => {
            use crate::adapters::coinmarketcap::{CoinMarketCapPriceSource, DEFAULT_BASE_URL};
            let base = data.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
            let key = data.api_key.as_deref().unwrap_or_default();
            let interval = if data.interval == DEFAULT_INTERVAL {
                "daily"
            } else {
                data.interval.as_str()
            };
            Ok(Box::new(
                CoinMarketCapPriceSource::new(base, key, &data.convert)?.with_interval(interval),
            ))
        }
        #[cfg(not(feature = "http"))]
        other => Err(EthSignalError::data_source(
            other.as_str(),
            "http feature is required for remote price sources",
        )),
    }
}

pub fn fetch_series(
    source: &dyn PriceSource,
    data: &DataConfig,
) -> Result<PriceSeries, EthSignalError> {
    info!(
        "Fetching {} prices for {} from {}",
        data.limit,
        data.symbol,
        source.name()
    );
    let series = source.fetch_prices(&data.symbol, data.limit)?;
    info!(
        "Loaded {} points, {} to {}",
        series.len(),
        series[0].timestamp,
        series.last().timestamp
    );
    Ok(series)
}

/// Fetch, simulate and optionally export. Returns the result for printing.
pub fn run_backtest_pipeline(
    source: &dyn PriceSource,
    data: &DataConfig,
    config: &BacktestConfig,
    report: Option<(&dyn ReportPort, &Path)>,
) -> Result<BacktestResult, EthSignalError> {
    let generator = config.strategy.build()?;
    let series = fetch_series(source, data)?;

    if series.len() <= generator.warmup() {
        warn!(
            "{} points is not more than the {}-period warmup of {}; no signals will fire",
            series.len(),
            generator.warmup(),
            generator.name()
        );
    }

    info!(
        "Running {} backtest with ${:.2} starting balance",
        generator.name(),
        config.initial_cash
    );
    let result = backtest_engine::run_with(&series, generator.as_ref(), config.initial_cash)?;

    if let Some((port, path)) = report {
        port.write(&result, path)?;
    }
    Ok(result)
}

pub fn format_summary(result: &BacktestResult) -> String {
    let m = &result.metrics;
    let mut out = String::new();
    out.push_str(&format!("=== {} backtest ===\n", result.strategy_name));
    out.push_str(&format!("Periods:          {}\n", result.steps.len()));
    out.push_str(&format!("Initial Value:    ${:.2}\n", result.initial_cash));
    out.push_str(&format!("Final Value:      ${:.2}\n", result.final_value));
    out.push_str(&format!("Total Return:     {:.2}%\n", m.total_return * 100.0));
    out.push_str(&format!("Max Drawdown:     -{:.2}%\n", m.max_drawdown * 100.0));
    out.push_str(&format!(
        "Signals:          {} buy / {} sell\n",
        m.buy_signals, m.sell_signals
    ));
    out.push_str(&format!("Trades Executed:  {}\n", m.trades));
    out.push_str(&format!(
        "Accuracy:         {:.2}% ({}/{} correct)\n",
        m.accuracy * 100.0,
        result.accuracy.correct,
        result.accuracy.total
    ));
    out
}

pub fn format_sentiment(symbol: &str, report: &SentimentReport) -> String {
    format!(
        "Simulated sentiment for {symbol} (step {}): {}\n\
         Suggested action: {}\n\
         Latest return: {:.4}%  rolling mean: {:.2}  rolling std: {:.4}\n",
        report.step,
        report.sentiment,
        report.action,
        report.features.latest_return * 100.0,
        report.features.rolling_mean,
        report.features.rolling_std,
    )
}

fn run_backtest(
    args: &DataArgs,
    overrides: &BacktestOverrides,
    output: Option<&Path>,
) -> Result<(), EthSignalError> {
    let config = load_config(args.config.as_deref())?;
    if args.config.is_some() {
        validate_backtest_config(&config)?;
    }

    let bt_config = build_backtest_config(&config, overrides)?;
    let data = build_data_config(&config, args)?;
    let source = build_price_source(&data)?;

    let output_path: Option<PathBuf> = output
        .map(Path::to_path_buf)
        .or_else(|| config.get_nonempty("report", "output").map(PathBuf::from));
    let reporter = CsvReportAdapter::new();
    let report = output_path
        .as_deref()
        .map(|p| (&reporter as &dyn ReportPort, p));

    let result = run_backtest_pipeline(source.as_ref(), &data, &bt_config, report)?;
    print!("{}", format_summary(&result));
    Ok(())
}

fn run_sentiment(args: &DataArgs) -> Result<(), EthSignalError> {
    let config = load_config(args.config.as_deref())?;
    let data = build_data_config(&config, args)?;
    let window = get_usize(&config, "backtest", "window", DEFAULT_WINDOW);
    let extractor = FeatureExtractor::new(window)?;

    let source = build_price_source(&data)?;
    let series = fetch_series(source.as_ref(), &data)?;
    let report = sentiment::summarize(&series, &extractor)?;
    print!("{}", format_sentiment(&data.symbol, &report));
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), EthSignalError> {
    let config = load_config(Some(config_path))?;
    validate_backtest_config(&config)?;
    let bt = build_backtest_config(&config, &BacktestOverrides::default())?;
    bt.strategy.build()?;
    let data = build_data_config(&config, &DataArgs::default())?;

    println!("Configuration is valid.");
    println!(
        "  strategy: {} (window {}, short {}, long {})",
        bt.strategy.kind, bt.strategy.window, bt.strategy.short_window, bt.strategy.long_window
    );
    println!("  initial cash: ${:.2}", bt.initial_cash);
    println!(
        "  data: {} {} x{} ({})",
        data.source, data.symbol, data.limit, data.interval
    );
    Ok(())
}
