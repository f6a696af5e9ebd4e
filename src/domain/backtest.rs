//! Backtest run: price series -> signals -> portfolio replay -> metrics.
//!
//! BacktestConfig defines the starting cash and the strategy to run.

use super::error::EthSignalError;
use super::metrics::Metrics;
use super::price::PriceSeries;
use super::signal::Signal;
use super::simulator::{simulate, AccuracyCounter, SimulationStep};
use super::strategy::{SignalGenerator, StrategyParams};

pub const DEFAULT_INITIAL_CASH: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_cash: f64,
    pub strategy: StrategyParams,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_cash: DEFAULT_INITIAL_CASH,
            strategy: StrategyParams::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub strategy_name: String,
    pub initial_cash: f64,
    pub steps: Vec<SimulationStep>,
    pub accuracy: AccuracyCounter,
    pub final_value: f64,
    pub metrics: Metrics,
}

/// Build the configured strategy and run it over `series`.
pub fn run_backtest(
    series: &PriceSeries,
    config: &BacktestConfig,
) -> Result<BacktestResult, EthSignalError> {
    let generator = config.strategy.build()?;
    run_with(series, generator.as_ref(), config.initial_cash)
}

/// Run an already constructed generator over `series`.
pub fn run_with(
    series: &PriceSeries,
    generator: &dyn SignalGenerator,
    initial_cash: f64,
) -> Result<BacktestResult, EthSignalError> {
    if initial_cash.is_nan() || initial_cash <= 0.0 {
        return Err(EthSignalError::NegativeInitialCash {
            value: initial_cash,
        });
    }
    let signals: Vec<Signal> = generator.generate(series);
    let sim = simulate(series, &signals, initial_cash)?;
    let metrics = Metrics::compute(&sim.steps, initial_cash, sim.final_value, &sim.accuracy);

    Ok(BacktestResult {
        strategy_name: generator.name().to_string(),
        initial_cash,
        steps: sim.steps,
        accuracy: sim.accuracy,
        final_value: sim.final_value,
        metrics,
    })
}
