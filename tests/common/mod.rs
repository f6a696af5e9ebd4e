#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use ethsignal::domain::error::EthSignalError;
use ethsignal::domain::price::{PricePoint, PriceSeries};
use ethsignal::ports::price_source::PriceSource;
use std::cell::RefCell;

/// In-memory price source. Records the symbol and limit of every fetch.
pub struct MockPriceSource {
    pub series: Option<PriceSeries>,
    pub error: Option<String>,
    pub requests: RefCell<Vec<(String, usize)>>,
}

impl MockPriceSource {
    pub fn new(series: PriceSeries) -> Self {
        Self {
            series: Some(series),
            error: None,
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            series: None,
            error: Some(reason.to_string()),
            requests: RefCell::new(Vec::new()),
        }
    }
}

impl PriceSource for MockPriceSource {
    fn name(&self) -> &str {
        "mock"
    }

    fn fetch_prices(&self, symbol: &str, limit: usize) -> Result<PriceSeries, EthSignalError> {
        self.requests.borrow_mut().push((symbol.to_string(), limit));
        if let Some(reason) = &self.error {
            return Err(EthSignalError::DataSource {
                source_name: "mock".to_string(),
                reason: reason.clone(),
            });
        }
        match &self.series {
            Some(series) => series.clone().tail(limit),
            None => Err(EthSignalError::EmptySeries),
        }
    }
}

pub fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Daily points starting 2024-01-01.
pub fn make_points(closes: &[f64]) -> Vec<PricePoint> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| PricePoint::new(start() + chrono::Duration::days(i as i64), c))
        .collect()
}

pub fn make_series(closes: &[f64]) -> PriceSeries {
    PriceSeries::new(make_points(closes)).unwrap()
}

/// A low-priced series on which the volatility strategy buys at index 3
/// and sells at index 6 with a window of 2.
pub const TRADING_CLOSES: [f64; 8] = [1.0, 1.0, 1.0, 1.2, 1.2, 1.2, 0.9, 0.9];

pub fn write_prices_csv(dir: &std::path::Path, closes: &[f64]) -> std::path::PathBuf {
    let mut content = String::from("date,open,close\n");
    for p in make_points(closes) {
        content.push_str(&format!(
            "{},{},{}\n",
            p.timestamp.format("%Y-%m-%d"),
            p.close,
            p.close
        ));
    }
    let path = dir.join("prices.csv");
    std::fs::write(&path, content).unwrap();
    path
}
