//! Rolling price features: latest return, rolling mean and rolling sample
//! standard deviation over a trailing window of closes.
//!
//! `extract` derives a snapshot from a prefix directly. `prepare` walks the
//! whole series once with a [`RollingWindow`] and yields the same snapshot
//! for every index that has enough history.

use std::collections::VecDeque;
use std::num::NonZeroUsize;

use super::error::EthSignalError;
use super::price::{pct_change, PricePoint};

pub const DEFAULT_WINDOW: usize = 5;

const DEFAULT_NONZERO_WINDOW: NonZeroUsize = match NonZeroUsize::new(DEFAULT_WINDOW) {
    Some(w) => w,
    None => panic!("DEFAULT_WINDOW must be non-zero"),
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureSnapshot {
    pub latest_return: f64,
    pub rolling_mean: f64,
    pub rolling_std: f64,
}

/// Fixed-capacity trailing window with amortised O(1) mean/variance updates.
///
/// Uses the sliding form of Welford's update so the variance does not
/// suffer the cancellation of a naive sum-of-squares. The running moments
/// are recomputed from the buffered values once every `capacity` evictions,
/// and whenever the window is nearly flat, so rounding error never
/// accumulates across more than one window's worth of updates.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    values: VecDeque<f64>,
    mean: f64,
    m2: f64,
    since_rebase: usize,
}

/// Relative variance below which the moments are recomputed exactly.
const NEAR_FLAT: f64 = 1e-12;

impl RollingWindow {
    pub fn new(capacity: NonZeroUsize) -> Self {
        RollingWindow {
            capacity: capacity.get(),
            values: VecDeque::with_capacity(capacity.get()),
            mean: 0.0,
            m2: 0.0,
            since_rebase: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() < self.capacity {
            self.values.push_back(value);
            let n = self.values.len() as f64;
            let delta = value - self.mean;
            self.mean += delta / n;
            self.m2 += delta * (value - self.mean);
        } else if let Some(evicted) = self.values.pop_front() {
            self.values.push_back(value);
            let n = self.capacity as f64;
            let old_mean = self.mean;
            self.mean += (value - evicted) / n;
            self.m2 += (value - evicted) * (value - self.mean + evicted - old_mean);
            self.since_rebase += 1;
        }

        let n = self.values.len() as f64;
        if self.since_rebase >= self.capacity || self.m2 <= NEAR_FLAT * self.mean * self.mean * n {
            self.rebase();
        }
    }

    /// Two-pass recomputation over the buffered values, oldest first.
    fn rebase(&mut self) {
        let n = self.values.len() as f64;
        self.mean = self.values.iter().sum::<f64>() / n;
        self.m2 = self
            .values
            .iter()
            .map(|v| {
                let d = v - self.mean;
                d * d
            })
            .sum();
        self.since_rebase = 0;
    }

    /// Mean of the window, `None` until it is full.
    pub fn mean(&self) -> Option<f64> {
        self.is_full().then_some(self.mean)
    }

    /// Sample standard deviation (n - 1 denominator), `None` until full.
    /// A single-value window has a deviation of 0.
    pub fn sample_std(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        if self.capacity == 1 {
            return Some(0.0);
        }
        Some((self.m2.max(0.0) / (self.capacity - 1) as f64).sqrt())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureExtractor {
    window: NonZeroUsize,
}

impl FeatureExtractor {
    /// `window` must be at least 1. A window of 1 has no sample deviation
    /// (the n - 1 denominator is zero); its `rolling_std` is reported as 0,
    /// so the volatility threshold degenerates to the sign of the return.
    pub fn new(window: usize) -> Result<Self, EthSignalError> {
        let window = NonZeroUsize::new(window)
            .ok_or_else(|| EthSignalError::invalid_config("window must be at least 1"))?;
        Ok(FeatureExtractor { window })
    }

    pub fn window(&self) -> usize {
        self.window.get()
    }

    /// Shortest prefix a snapshot can be computed from.
    pub fn min_history(&self) -> usize {
        self.window() + 1
    }

    /// Snapshot for the last point of `prefix`, using nothing after it.
    pub fn extract(&self, prefix: &[PricePoint]) -> Result<FeatureSnapshot, EthSignalError> {
        let need = self.min_history();
        if prefix.len() < need {
            return Err(EthSignalError::InsufficientHistory {
                have: prefix.len(),
                need,
            });
        }

        let i = prefix.len() - 1;
        let latest_return = pct_change(prefix[i - 1].close, prefix[i].close);

        let trailing = &prefix[prefix.len() - self.window()..];
        let n = self.window() as f64;
        let rolling_mean = trailing.iter().map(|p| p.close).sum::<f64>() / n;
        let rolling_std = if self.window() == 1 {
            0.0
        } else {
            let sq: f64 = trailing
                .iter()
                .map(|p| {
                    let d = p.close - rolling_mean;
                    d * d
                })
                .sum();
            (sq / (n - 1.0)).sqrt()
        };

        Ok(FeatureSnapshot {
            latest_return,
            rolling_mean,
            rolling_std,
        })
    }

    /// One entry per point; `None` where the history is shorter than
    /// [`min_history`](Self::min_history).
    pub fn prepare(&self, series: &[PricePoint]) -> Vec<Option<FeatureSnapshot>> {
        let mut out = Vec::with_capacity(series.len());
        let mut rolling = RollingWindow::new(self.window);

        for (i, point) in series.iter().enumerate() {
            rolling.push(point.close);
            if i + 1 < self.min_history() {
                out.push(None);
                continue;
            }
            let snapshot = match (rolling.mean(), rolling.sample_std()) {
                (Some(rolling_mean), Some(rolling_std)) => Some(FeatureSnapshot {
                    latest_return: pct_change(series[i - 1].close, point.close),
                    rolling_mean,
                    rolling_std,
                }),
                _ => None,
            };
            out.push(snapshot);
        }
        out
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        FeatureExtractor {
            window: DEFAULT_NONZERO_WINDOW,
        }
    }
}
