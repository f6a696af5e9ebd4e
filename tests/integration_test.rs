//! Integration tests for the signal and simulation pipeline.
//!
//! Tests cover:
//! - Feature extraction and signals never look ahead
//! - All-in/all-out portfolio invariants
//! - Crossover edge triggering
//! - Known volatility-strategy runs end to end
//! - Error surface for empty series and bad configuration

mod common;

use approx::assert_relative_eq;
use common::*;
use ethsignal::domain::backtest::{run_backtest, run_with, BacktestConfig};
use ethsignal::domain::error::EthSignalError;
use ethsignal::domain::features::FeatureExtractor;
use ethsignal::domain::signal::Signal;
use ethsignal::domain::simulator::simulate;
use ethsignal::domain::strategy::{
    MaCrossover, SentimentCycle, SignalGenerator, StrategyKind, StrategyParams, Trend,
    VolatilityThreshold,
};
use proptest::prelude::*;

fn closes_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.5f64..5.0, 2..60)
}

fn signal_strategy() -> impl Strategy<Value = Signal> {
    prop_oneof![
        Just(Signal::Buy),
        Just(Signal::Sell),
        Just(Signal::Hold),
        Just(Signal::None),
    ]
}

mod causality {
    use super::*;

    proptest! {
        #[test]
        fn volatility_signals_ignore_future_prices(
            closes in closes_strategy(),
            window in 1usize..8,
            cut in 0usize..60,
        ) {
            let points = make_points(&closes);
            let cut = cut.min(points.len());
            let strategy = VolatilityThreshold::new(window).unwrap();

            let full = strategy.generate(&points);
            let prefix = strategy.generate(&points[..cut]);
            prop_assert_eq!(&full[..cut], &prefix[..]);
        }

        #[test]
        fn crossover_signals_ignore_future_prices(
            closes in closes_strategy(),
            short in 1usize..5,
            extra in 1usize..6,
            cut in 0usize..60,
        ) {
            let points = make_points(&closes);
            let cut = cut.min(points.len());
            let strategy = MaCrossover::new(short, short + extra).unwrap();

            let full = strategy.generate(&points);
            let prefix = strategy.generate(&points[..cut]);
            prop_assert_eq!(&full[..cut], &prefix[..]);
        }

        #[test]
        fn signal_at_agrees_with_generate(
            closes in closes_strategy(),
            window in 1usize..6,
        ) {
            let points = make_points(&closes);
            let strategy = VolatilityThreshold::new(window).unwrap();
            let signals = strategy.generate(&points);

            for i in 0..points.len() {
                match strategy.signal_at(&points[..=i]) {
                    Ok(signal) => prop_assert_eq!(signal, signals[i]),
                    Err(EthSignalError::InsufficientHistory { .. }) => {
                        prop_assert_eq!(signals[i], Signal::None)
                    }
                    Err(other) => prop_assert!(false, "unexpected error {}", other),
                }
            }
        }
    }

    #[test]
    fn one_signal_per_point() {
        let points = make_points(&TRADING_CLOSES);
        assert_eq!(VolatilityThreshold::new(2).unwrap().generate(&points).len(), 8);
        assert_eq!(MaCrossover::new(2, 3).unwrap().generate(&points).len(), 8);
        assert_eq!(SentimentCycle.generate(&points).len(), 8);
    }

    #[test]
    fn warmup_emits_none() {
        let points = make_points(&TRADING_CLOSES);
        let signals = VolatilityThreshold::new(3).unwrap().generate(&points);
        assert!(signals[..3].iter().all(|s| *s == Signal::None));
        assert!(signals[3..].iter().all(|s| *s != Signal::None));
    }
}

mod portfolio_invariants {
    use super::*;

    proptest! {
        #[test]
        fn cash_and_position_are_never_both_held(
            (closes, signals) in closes_strategy().prop_flat_map(|c| {
                let n = c.len();
                (Just(c), prop::collection::vec(signal_strategy(), n))
            }),
            cash in 1.0f64..1_000_000.0,
        ) {
            let series = make_series(&closes);
            let result = simulate(&series, &signals, cash).unwrap();

            prop_assert_eq!(result.steps.len(), closes.len());
            for step in &result.steps {
                prop_assert!((step.cash > 0.0) != (step.position > 0.0));
                prop_assert!(step.cash >= 0.0 && step.position >= 0.0);
            }
        }

        #[test]
        fn holdings_unchanged_without_a_trade(
            (closes, signals) in closes_strategy().prop_flat_map(|c| {
                let n = c.len();
                (Just(c), prop::collection::vec(signal_strategy(), n))
            }),
        ) {
            let series = make_series(&closes);
            let result = simulate(&series, &signals, 1000.0).unwrap();

            for step in &result.steps {
                prop_assert_eq!(step.portfolio_value, step.cash + step.position * step.close);
            }
            for pair in result.steps.windows(2) {
                let (prev, curr) = (&pair[0], &pair[1]);
                if !curr.executed {
                    prop_assert_eq!(prev.cash, curr.cash);
                    prop_assert_eq!(prev.position, curr.position);
                }
                if matches!(curr.action, Signal::Hold | Signal::None) {
                    prop_assert!(!curr.executed);
                }
            }
        }

        #[test]
        fn accuracy_is_a_ratio_of_scored_calls(
            (closes, signals) in closes_strategy().prop_flat_map(|c| {
                let n = c.len();
                (Just(c), prop::collection::vec(signal_strategy(), n))
            }),
        ) {
            let series = make_series(&closes);
            let result = simulate(&series, &signals, 1000.0).unwrap();
            let directional = signals[..signals.len() - 1]
                .iter()
                .filter(|s| s.is_directional())
                .count();

            prop_assert_eq!(result.accuracy.total, directional);
            prop_assert!(result.accuracy.correct <= result.accuracy.total);
            let ratio = result.accuracy.ratio();
            prop_assert!((0.0..=1.0).contains(&ratio));
        }
    }

    #[test]
    fn value_follows_price_while_long() {
        let series = make_series(&[100.0, 110.0, 121.0]);
        let result = simulate(&series, &[Signal::Buy, Signal::Hold, Signal::Hold], 1000.0).unwrap();
        assert_relative_eq!(result.steps[1].portfolio_value, 1100.0, epsilon = 1e-9);
        assert_relative_eq!(result.final_value, 1210.0, epsilon = 1e-9);
    }
}

mod crossover {
    use super::*;

    #[test]
    fn single_buy_on_sustained_uptrend() {
        let points = make_points(&[5.0, 5.0, 5.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
        let signals = MaCrossover::new(2, 4).unwrap().generate(&points);

        let buys: Vec<usize> = signals
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == Signal::Buy)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(buys, vec![4]);
        assert!(!signals.contains(&Signal::Sell));
    }

    fn positions(signals: &[Signal], wanted: Signal) -> Vec<usize> {
        signals
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == wanted)
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn flat_stretch_is_a_tie_and_re_arms_on_the_next_rise() {
        let mut closes = vec![
            2310.17, 2298.43, 2351.91, 2402.07, 2388.39, 2291.53, 2450.11, 2399.97,
        ];
        closes.extend([2380.21; 20]);
        closes.extend([2390.0, 2400.0, 2410.0]);
        let points = make_points(&closes);
        let strategy = MaCrossover::new(3, 7).unwrap();

        let trends = strategy.trends(&points);
        assert!(trends[14..28].iter().all(|t| *t == Trend::Neutral));

        let signals = strategy.generate(&points);
        assert_eq!(positions(&signals, Signal::Buy), vec![6, 28]);
        assert_eq!(positions(&signals, Signal::Sell), vec![10]);
    }

    proptest! {
        #[test]
        fn flat_closes_after_any_history_are_neutral(
            prefix in prop::collection::vec(1000.0f64..5000.0, 1..300),
            flat in 1000.0f64..5000.0,
            short in 1usize..10,
            extra in 1usize..20,
        ) {
            let long = short + extra;
            let mut closes = prefix.clone();
            closes.extend(std::iter::repeat_n(flat, long + 10));
            let trends = MaCrossover::new(short, long)
                .unwrap()
                .trends(&make_points(&closes));

            let first_flat_window = prefix.len() + long - 1;
            prop_assert!(trends[first_flat_window..].iter().all(|t| *t == Trend::Neutral));
        }
    }

    #[test]
    fn inverted_windows_rejected() {
        let err = MaCrossover::new(20, 5).unwrap_err();
        assert!(matches!(err, EthSignalError::InvalidConfiguration { .. }));

        let params = StrategyParams {
            kind: StrategyKind::Crossover,
            short_window: 20,
            long_window: 5,
            ..StrategyParams::default()
        };
        assert!(matches!(
            params.build().err(),
            Some(EthSignalError::InvalidConfiguration { .. })
        ));
    }
}

mod volatility_backtest {
    use super::*;

    #[test]
    fn small_moves_on_a_price_scale_series_hold() {
        let series = make_series(&[100.0, 102.0, 101.0, 105.0, 103.0, 110.0]);
        let strategy = VolatilityThreshold::new(3).unwrap();
        let result = run_with(&series, &strategy, 1000.0).unwrap();

        let actions: Vec<Signal> = result.steps.iter().map(|s| s.action).collect();
        assert_eq!(&actions[..3], &[Signal::None; 3]);
        assert_eq!(&actions[3..], &[Signal::Hold; 3]);
        assert_relative_eq!(result.final_value, 1000.0);
        assert_eq!(result.metrics.trades, 0);
        assert_eq!(result.accuracy.total, 0);
    }

    #[test]
    fn buys_then_sells_at_a_loss() {
        let series = make_series(&TRADING_CLOSES);
        let config = BacktestConfig {
            initial_cash: 1000.0,
            strategy: StrategyParams {
                window: 2,
                ..StrategyParams::default()
            },
        };
        let result = run_backtest(&series, &config).unwrap();

        let actions: Vec<Signal> = result.steps.iter().map(|s| s.action).collect();
        assert_eq!(
            actions,
            vec![
                Signal::None,
                Signal::None,
                Signal::Hold,
                Signal::Buy,
                Signal::Hold,
                Signal::Hold,
                Signal::Sell,
                Signal::Hold,
            ]
        );
        assert_eq!(result.strategy_name, "volatility");
        assert_eq!(result.metrics.trades, 2);
        assert_eq!(result.metrics.buy_signals, 1);
        assert_eq!(result.metrics.sell_signals, 1);
        assert_relative_eq!(result.final_value, 750.0, epsilon = 1e-9);
        assert_relative_eq!(result.metrics.total_return, -0.25, epsilon = 1e-12);
        assert_relative_eq!(result.metrics.max_drawdown, 0.25, epsilon = 1e-12);
        // both calls were followed by a flat close
        assert_eq!(result.accuracy.total, 2);
        assert_eq!(result.accuracy.correct, 0);
    }

    #[test]
    fn features_for_the_buy_bar() {
        let points = make_points(&TRADING_CLOSES);
        let snap = FeatureExtractor::new(2).unwrap().extract(&points[..4]).unwrap();
        assert_relative_eq!(snap.latest_return, 0.2, epsilon = 1e-12);
        assert_relative_eq!(snap.rolling_mean, 1.1, epsilon = 1e-12);
        assert_relative_eq!(snap.rolling_std, 0.2 / 2f64.sqrt(), epsilon = 1e-12);
    }
}

mod sentiment_backtest {
    use super::*;

    #[test]
    fn cycle_trades_on_schedule() {
        let series = make_series(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        let config = BacktestConfig {
            initial_cash: 100.0,
            strategy: StrategyParams {
                kind: StrategyKind::Sentiment,
                ..StrategyParams::default()
            },
        };
        let result = run_backtest(&series, &config).unwrap();

        // buy at 10, sell at 13, buy again at 15
        let executed: Vec<usize> = result
            .steps
            .iter()
            .enumerate()
            .filter(|(_, s)| s.executed)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(executed, vec![0, 3, 5]);
        assert_relative_eq!(result.final_value, 130.0, epsilon = 1e-9);
    }
}

mod errors {
    use super::*;

    #[test]
    fn simulate_empty_series() {
        let err = simulate(&[], &[], 1000.0).unwrap_err();
        assert!(matches!(err, EthSignalError::EmptySeries));
    }

    #[test]
    fn non_positive_cash() {
        let series = make_series(&[1.0, 2.0]);
        for cash in [0.0, -10.0, f64::NAN] {
            let err = run_with(&series, &SentimentCycle, cash).unwrap_err();
            assert!(matches!(err, EthSignalError::NegativeInitialCash { .. }));
        }
    }

    #[test]
    fn mismatched_signal_stream() {
        let series = make_series(&[1.0, 2.0, 3.0]);
        let err = simulate(&series, &[Signal::Buy], 1000.0).unwrap_err();
        assert!(matches!(
            err,
            EthSignalError::SignalStreamMismatch {
                prices: 3,
                signals: 1
            }
        ));
    }

    #[test]
    fn extractor_insufficient_history() {
        let points = make_points(&[1.0, 2.0, 3.0]);
        let err = FeatureExtractor::new(5).unwrap().extract(&points).unwrap_err();
        assert!(matches!(
            err,
            EthSignalError::InsufficientHistory { have: 3, need: 6 }
        ));
    }
}
