//! Simulated market sentiment: a fixed five-label cycle indexed by step.

use std::fmt;

use super::error::EthSignalError;
use super::features::{FeatureExtractor, FeatureSnapshot};
use super::price::PricePoint;
use super::signal::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    StronglyBullish,
    SlightlyBullish,
    Neutral,
    SlightlyBearish,
    StronglyBearish,
}

pub const CYCLE: [Sentiment; 5] = [
    Sentiment::StronglyBullish,
    Sentiment::SlightlyBullish,
    Sentiment::Neutral,
    Sentiment::SlightlyBearish,
    Sentiment::StronglyBearish,
];

impl Sentiment {
    pub fn at_step(step: usize) -> Self {
        CYCLE[step % CYCLE.len()]
    }

    pub fn label(self) -> &'static str {
        match self {
            Sentiment::StronglyBullish => "Strongly Bullish",
            Sentiment::SlightlyBullish => "Slightly Bullish",
            Sentiment::Neutral => "Neutral",
            Sentiment::SlightlyBearish => "Slightly Bearish",
            Sentiment::StronglyBearish => "Strongly Bearish",
        }
    }

    pub fn suggested_action(self) -> Signal {
        match self {
            Sentiment::StronglyBullish | Sentiment::SlightlyBullish => Signal::Buy,
            Sentiment::Neutral => Signal::Hold,
            Sentiment::SlightlyBearish | Sentiment::StronglyBearish => Signal::Sell,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Sentiment reading for the latest period of a series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentimentReport {
    pub step: usize,
    pub sentiment: Sentiment,
    pub action: Signal,
    pub features: FeatureSnapshot,
}

/// Read the sentiment at the last point of `series` alongside its features.
pub fn summarize(
    series: &[PricePoint],
    extractor: &FeatureExtractor,
) -> Result<SentimentReport, EthSignalError> {
    let features = extractor.extract(series)?;
    let step = series.len() - 1;
    let sentiment = Sentiment::at_step(step);
    Ok(SentimentReport {
        step,
        sentiment,
        action: sentiment.suggested_action(),
        features,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn points(n: usize) -> Vec<PricePoint> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (0..n)
            .map(|i| PricePoint::new(start + chrono::Duration::days(i as i64), 100.0 + i as f64))
            .collect()
    }

    #[test]
    fn cycles_every_five_steps() {
        assert_eq!(Sentiment::at_step(0), Sentiment::StronglyBullish);
        assert_eq!(Sentiment::at_step(2), Sentiment::Neutral);
        assert_eq!(Sentiment::at_step(4), Sentiment::StronglyBearish);
        assert_eq!(Sentiment::at_step(5), Sentiment::StronglyBullish);
        assert_eq!(Sentiment::at_step(13), Sentiment::SlightlyBearish);
    }

    #[test]
    fn bullish_buys_bearish_sells() {
        let actions: Vec<Signal> = CYCLE.iter().map(|s| s.suggested_action()).collect();
        assert_eq!(
            actions,
            vec![
                Signal::Buy,
                Signal::Buy,
                Signal::Hold,
                Signal::Sell,
                Signal::Sell
            ]
        );
    }

    #[test]
    fn labels() {
        assert_eq!(Sentiment::SlightlyBullish.to_string(), "Slightly Bullish");
    }

    #[test]
    fn summarize_uses_last_step() {
        let extractor = FeatureExtractor::new(3).unwrap();
        let report = summarize(&points(9), &extractor).unwrap();
        assert_eq!(report.step, 8);
        assert_eq!(report.sentiment, Sentiment::SlightlyBearish);
        assert_eq!(report.action, Signal::Sell);
        assert!((report.features.rolling_mean - 107.0).abs() < 1e-9);
    }

    #[test]
    fn summarize_needs_history() {
        let extractor = FeatureExtractor::new(5).unwrap();
        let err = summarize(&points(3), &extractor).unwrap_err();
        assert!(matches!(
            err,
            EthSignalError::InsufficientHistory { have: 3, need: 6 }
        ));
    }
}
