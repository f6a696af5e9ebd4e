//! Summary statistics over a completed simulation.

use super::signal::Signal;
use super::simulator::{AccuracyCounter, SimulationStep};

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_return: f64,
    pub max_drawdown: f64,
    pub trades: usize,
    pub buy_signals: usize,
    pub sell_signals: usize,
    pub accuracy: f64,
}

impl Metrics {
    pub fn compute(
        steps: &[SimulationStep],
        initial_cash: f64,
        final_value: f64,
        accuracy: &AccuracyCounter,
    ) -> Self {
        let total_return = if initial_cash > 0.0 {
            (final_value - initial_cash) / initial_cash
        } else {
            0.0
        };

        Metrics {
            total_return,
            max_drawdown: compute_drawdown(steps, initial_cash),
            trades: steps.iter().filter(|s| s.executed).count(),
            buy_signals: steps.iter().filter(|s| s.action == Signal::Buy).count(),
            sell_signals: steps.iter().filter(|s| s.action == Signal::Sell).count(),
            accuracy: accuracy.ratio(),
        }
    }
}

/// Largest peak-to-trough decline as a fraction of the running peak,
/// starting from the initial cash.
fn compute_drawdown(steps: &[SimulationStep], initial_cash: f64) -> f64 {
    let mut peak = initial_cash;
    let mut max_dd = 0.0_f64;

    for step in steps {
        if step.portfolio_value > peak {
            peak = step.portfolio_value;
        }
        if peak > 0.0 {
            let dd = (peak - step.portfolio_value) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }

    max_dd
}
