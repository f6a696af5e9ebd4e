//! Two-asset (cash / position) portfolio replay against a signal stream.
//!
//! Trading is all-in/all-out: a Buy moves all cash into the asset, a Sell
//! moves the whole position back to cash. Buy while long and Sell while flat
//! are no-ops. `Hold` and `None` never trade.
//!
//! Directional accuracy scores each Buy/Sell made at period `i` against the
//! move from `close[i]` to `close[i + 1]`. A flat move is a miss. The last
//! period has no realised outcome and is never scored.

use chrono::NaiveDateTime;

use super::error::EthSignalError;
use super::price::{pct_change, PricePoint};
use super::signal::Signal;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortfolioState {
    pub cash: f64,
    pub position: f64,
}

impl PortfolioState {
    pub fn new(initial_cash: f64) -> Self {
        PortfolioState {
            cash: initial_cash,
            position: 0.0,
        }
    }

    pub fn value(&self, price: f64) -> f64 {
        self.cash + self.position * price
    }

    pub fn is_long(&self) -> bool {
        self.position > 0.0
    }

    /// Apply `signal` at `price`. Returns whether a trade executed.
    pub fn apply(&mut self, signal: Signal, price: f64) -> bool {
        match signal {
            Signal::Buy if self.cash > 0.0 => {
                self.position = self.cash / price;
                self.cash = 0.0;
                true
            }
            Signal::Sell if self.position > 0.0 => {
                self.cash = self.position * price;
                self.position = 0.0;
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationStep {
    pub timestamp: NaiveDateTime,
    pub close: f64,
    pub action: Signal,
    pub executed: bool,
    pub cash: f64,
    pub position: f64,
    pub portfolio_value: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccuracyCounter {
    pub correct: usize,
    pub total: usize,
}

impl AccuracyCounter {
    /// Score a directional call against a realised return. Non-directional
    /// actions are ignored.
    pub fn record(&mut self, action: Signal, realised_return: f64) {
        let hit = match action {
            Signal::Buy => realised_return > 0.0,
            Signal::Sell => realised_return < 0.0,
            Signal::Hold | Signal::None => return,
        };
        self.total += 1;
        if hit {
            self.correct += 1;
        }
    }

    /// `correct / total`, or 0 when nothing was scored.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub steps: Vec<SimulationStep>,
    pub accuracy: AccuracyCounter,
    pub final_value: f64,
}

/// Lazy step-by-step replay. Stop iterating to abandon a run.
#[derive(Debug, Clone)]
pub struct Replay<'a> {
    series: &'a [PricePoint],
    signals: &'a [Signal],
    index: usize,
    state: PortfolioState,
    accuracy: AccuracyCounter,
}

impl<'a> Replay<'a> {
    pub fn new(
        series: &'a [PricePoint],
        signals: &'a [Signal],
        initial_cash: f64,
    ) -> Result<Self, EthSignalError> {
        if series.is_empty() {
            return Err(EthSignalError::EmptySeries);
        }
        if initial_cash.is_nan() || initial_cash <= 0.0 {
            return Err(EthSignalError::NegativeInitialCash {
                value: initial_cash,
            });
        }
        if signals.len() != series.len() {
            return Err(EthSignalError::SignalStreamMismatch {
                prices: series.len(),
                signals: signals.len(),
            });
        }
        Ok(Replay {
            series,
            signals,
            index: 0,
            state: PortfolioState::new(initial_cash),
            accuracy: AccuracyCounter::default(),
        })
    }

    pub fn state(&self) -> PortfolioState {
        self.state
    }

    pub fn accuracy(&self) -> AccuracyCounter {
        self.accuracy
    }
}

impl Iterator for Replay<'_> {
    type Item = SimulationStep;

    fn next(&mut self) -> Option<SimulationStep> {
        let i = self.index;
        let point = self.series.get(i)?;
        let action = self.signals[i];
        self.index += 1;

        let executed = self.state.apply(action, point.close);

        if let Some(next) = self.series.get(i + 1) {
            self.accuracy
                .record(action, pct_change(point.close, next.close));
        }

        Some(SimulationStep {
            timestamp: point.timestamp,
            close: point.close,
            action,
            executed,
            cash: self.state.cash,
            position: self.state.position,
            portfolio_value: self.state.value(point.close),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.series.len() - self.index;
        (remaining, Some(remaining))
    }
}

/// Replay the whole series and collect every step.
pub fn simulate(
    series: &[PricePoint],
    signals: &[Signal],
    initial_cash: f64,
) -> Result<SimulationResult, EthSignalError> {
    let mut replay = Replay::new(series, signals, initial_cash)?;
    let steps: Vec<SimulationStep> = replay.by_ref().collect();
    let last_close = series[series.len() - 1].close;
    Ok(SimulationResult {
        steps,
        accuracy: replay.accuracy(),
        final_value: replay.state().value(last_close),
    })
}
