//! Binance spot klines price source.
//!
//! `GET /api/v3/klines` returns one JSON array per candle:
//! `[open_time_ms, "open", "high", "low", "close", "volume", close_time_ms, ...]`.
//! Each candle becomes one price point stamped with its open time.

use crate::adapters::http::{build_client, get_json, RetryPolicy};
use crate::domain::error::EthSignalError;
use crate::domain::price::{PricePoint, PriceSeries};
use crate::ports::price_source::PriceSource;
use chrono::DateTime;
use reqwest::blocking::Client;
use serde_json::Value;

const SOURCE_NAME: &str = "binance";
pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";
/// Largest page the klines endpoint serves.
pub const MAX_LIMIT: usize = 1000;

pub struct BinancePriceSource {
    client: Client,
    base_url: String,
    interval: String,
    retry: RetryPolicy,
}

impl BinancePriceSource {
    pub fn new(base_url: &str, interval: &str) -> Result<Self, EthSignalError> {
        Ok(Self {
            client: build_client(SOURCE_NAME)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            interval: interval.to_string(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn klines_url(&self) -> String {
        format!("{}/api/v3/klines", self.base_url)
    }
}

impl PriceSource for BinancePriceSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn fetch_prices(&self, symbol: &str, limit: usize) -> Result<PriceSeries, EthSignalError> {
        let limit = limit.clamp(1, MAX_LIMIT);
        let url = self.klines_url();
        tracing::info!(symbol, interval = %self.interval, limit, "fetching klines");

        let rows: Vec<Vec<Value>> = get_json(SOURCE_NAME, &self.retry, || {
            self.client.get(&url).query(&[
                ("symbol", symbol.to_uppercase()),
                ("interval", self.interval.clone()),
                ("limit", limit.to_string()),
            ])
        })?;

        parse_klines(&rows)
    }
}

fn field_f64(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

pub fn parse_klines(rows: &[Vec<Value>]) -> Result<PriceSeries, EthSignalError> {
    let mut points = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let open_time = row.first().and_then(Value::as_i64).ok_or_else(|| {
            EthSignalError::data_source(SOURCE_NAME, format!("kline {i}: missing open time"))
        })?;
        let timestamp = DateTime::from_timestamp_millis(open_time)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| {
                EthSignalError::data_source(
                    SOURCE_NAME,
                    format!("kline {i}: invalid open time {open_time}"),
                )
            })?;
        let close = row.get(4).and_then(field_f64).ok_or_else(|| {
            EthSignalError::data_source(SOURCE_NAME, format!("kline {i}: missing close"))
        })?;
        points.push(PricePoint::new(timestamp, close));
    }
    PriceSeries::from_unsorted(points)
}
