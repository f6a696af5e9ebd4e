//! Signal-generation strategies and strategy selection.
//!
//! Every strategy implements [`SignalGenerator`] and produces exactly one
//! [`Signal`] per price point. Three are provided:
//! - [`VolatilityThreshold`]: pointwise, causal, return vs rolling std.
//! - [`MaCrossover`]: edge-triggered on short/long moving-average crossings.
//! - [`SentimentCycle`]: deterministic cycling sentiment stub.

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use super::error::EthSignalError;
use super::features::{FeatureExtractor, FeatureSnapshot, RollingWindow, DEFAULT_WINDOW};
use super::price::PricePoint;
use super::sentiment::Sentiment;
use super::signal::Signal;

pub const DEFAULT_SHORT_WINDOW: usize = 5;
pub const DEFAULT_LONG_WINDOW: usize = 20;

pub trait SignalGenerator {
    fn name(&self) -> &str;

    /// Number of leading periods for which no decision can be made.
    fn warmup(&self) -> usize;

    /// One signal per point of `series`, in order.
    fn generate(&self, series: &[PricePoint]) -> Vec<Signal>;
}

/// Buy when the latest return is positive and exceeds the rolling std,
/// sell when it is negative and its magnitude exceeds the rolling std.
#[derive(Debug, Clone)]
pub struct VolatilityThreshold {
    extractor: FeatureExtractor,
}

impl VolatilityThreshold {
    pub fn new(window: usize) -> Result<Self, EthSignalError> {
        Ok(VolatilityThreshold {
            extractor: FeatureExtractor::new(window)?,
        })
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn classify(snapshot: &FeatureSnapshot) -> Signal {
        let r = snapshot.latest_return;
        if r > 0.0 && r > snapshot.rolling_std {
            Signal::Buy
        } else if r < 0.0 && r.abs() > snapshot.rolling_std {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }

    /// Decision for the last point of `prefix`.
    pub fn signal_at(&self, prefix: &[PricePoint]) -> Result<Signal, EthSignalError> {
        let snapshot = self.extractor.extract(prefix)?;
        Ok(Self::classify(&snapshot))
    }
}

impl SignalGenerator for VolatilityThreshold {
    fn name(&self) -> &str {
        "volatility"
    }

    fn warmup(&self) -> usize {
        self.extractor.window()
    }

    fn generate(&self, series: &[PricePoint]) -> Vec<Signal> {
        self.extractor
            .prepare(series)
            .iter()
            .map(|snapshot| snapshot.as_ref().map_or(Signal::None, Self::classify))
            .collect()
    }
}

/// Trend state derived from the two moving averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Neutral,
}

/// Averages closer than this fraction of their magnitude are a tie.
pub const TIE_TOLERANCE: f64 = 1e-9;

impl Trend {
    /// Compare a short and a long moving average.
    pub fn between(short_ma: f64, long_ma: f64) -> Self {
        let scale = short_ma.abs().max(long_ma.abs());
        if (short_ma - long_ma).abs() <= TIE_TOLERANCE * scale {
            Trend::Neutral
        } else if short_ma > long_ma {
            Trend::Up
        } else {
            Trend::Down
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaCrossover {
    short_window: NonZeroUsize,
    long_window: NonZeroUsize,
}

impl MaCrossover {
    pub fn new(short_window: usize, long_window: usize) -> Result<Self, EthSignalError> {
        let short = NonZeroUsize::new(short_window)
            .ok_or_else(|| EthSignalError::invalid_config("short_window must be at least 1"))?;
        if short_window >= long_window {
            return Err(EthSignalError::invalid_config(format!(
                "short_window ({short_window}) must be less than long_window ({long_window})"
            )));
        }
        let long = NonZeroUsize::new(long_window)
            .ok_or_else(|| EthSignalError::invalid_config("long_window must be at least 1"))?;
        Ok(MaCrossover {
            short_window: short,
            long_window: long,
        })
    }

    pub fn short_window(&self) -> usize {
        self.short_window.get()
    }

    pub fn long_window(&self) -> usize {
        self.long_window.get()
    }

    /// Per-point trend. Neutral while either average is unfilled and on ties.
    pub fn trends(&self, series: &[PricePoint]) -> Vec<Trend> {
        let mut short = RollingWindow::new(self.short_window);
        let mut long = RollingWindow::new(self.long_window);

        series
            .iter()
            .map(|point| {
                short.push(point.close);
                long.push(point.close);
                match (short.mean(), long.mean()) {
                    (Some(s), Some(l)) => Trend::between(s, l),
                    _ => Trend::Neutral,
                }
            })
            .collect()
    }
}

impl SignalGenerator for MaCrossover {
    fn name(&self) -> &str {
        "crossover"
    }

    fn warmup(&self) -> usize {
        self.long_window() - 1
    }

    fn generate(&self, series: &[PricePoint]) -> Vec<Signal> {
        let mut previous = Trend::Neutral;
        self.trends(series)
            .into_iter()
            .map(|trend| {
                let signal = match trend {
                    Trend::Up if previous != Trend::Up => Signal::Buy,
                    Trend::Down if previous != Trend::Down => Signal::Sell,
                    _ => Signal::None,
                };
                previous = trend;
                signal
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SentimentCycle;

impl SignalGenerator for SentimentCycle {
    fn name(&self) -> &str {
        "sentiment"
    }

    fn warmup(&self) -> usize {
        0
    }

    fn generate(&self, series: &[PricePoint]) -> Vec<Signal> {
        (0..series.len())
            .map(|step| Sentiment::at_step(step).suggested_action())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    #[default]
    Volatility,
    Crossover,
    Sentiment,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::Volatility,
        StrategyKind::Crossover,
        StrategyKind::Sentiment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Volatility => "volatility",
            StrategyKind::Crossover => "crossover",
            StrategyKind::Sentiment => "sentiment",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = EthSignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        StrategyKind::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| {
                EthSignalError::invalid_config(format!(
                    "unknown strategy '{s}' (expected volatility, crossover or sentiment)"
                ))
            })
    }
}

/// Strategy selection plus the parameters every variant may need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyParams {
    pub kind: StrategyKind,
    pub window: usize,
    pub short_window: usize,
    pub long_window: usize,
}

impl Default for StrategyParams {
    fn default() -> Self {
        StrategyParams {
            kind: StrategyKind::Volatility,
            window: DEFAULT_WINDOW,
            short_window: DEFAULT_SHORT_WINDOW,
            long_window: DEFAULT_LONG_WINDOW,
        }
    }
}

impl StrategyParams {
    pub fn build(&self) -> Result<Box<dyn SignalGenerator>, EthSignalError> {
        Ok(match self.kind {
            StrategyKind::Volatility => Box::new(VolatilityThreshold::new(self.window)?),
            StrategyKind::Crossover => {
                Box::new(MaCrossover::new(self.short_window, self.long_window)?)
            }
            StrategyKind::Sentiment => Box::new(SentimentCycle),
        })
    }
}
