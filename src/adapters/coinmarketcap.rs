//! CoinMarketCap historical quotes price source.
//!
//! Uses `/v2/cryptocurrency/quotes/historical`, which reports each period
//! as a `price` under `quote.<convert>`. Requires an API key.

use crate::adapters::csv_price_source::parse_timestamp;
use crate::adapters::http::{build_client, get_json, RetryPolicy};
use crate::domain::error::EthSignalError;
use crate::domain::price::{PricePoint, PriceSeries, CLOSE_ALIASES};
use crate::ports::price_source::PriceSource;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::collections::HashMap;

const SOURCE_NAME: &str = "coinmarketcap";
pub const DEFAULT_BASE_URL: &str = "https://pro-api.coinmarketcap.com";
pub const API_KEY_ENV: &str = "CMC_PRO_API_KEY";

#[derive(Debug, Deserialize)]
pub struct HistoricalResponse {
    data: HashMap<String, Vec<Asset>>,
}

#[derive(Debug, Deserialize)]
struct Asset {
    #[serde(default)]
    quotes: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    timestamp: String,
    quote: HashMap<String, QuotePrice>,
}

#[derive(Debug, Deserialize)]
struct QuotePrice {
    #[serde(alias = "close")]
    price: Option<f64>,
}

pub struct CoinMarketCapPriceSource {
    client: Client,
    base_url: String,
    api_key: String,
    convert: String,
    interval: String,
    retry: RetryPolicy,
}

impl CoinMarketCapPriceSource {
    pub fn new(base_url: &str, api_key: &str, convert: &str) -> Result<Self, EthSignalError> {
        if api_key.trim().is_empty() {
            return Err(EthSignalError::data_source(
                SOURCE_NAME,
                format!("API key required (set [data] api_key or {API_KEY_ENV})"),
            ));
        }
        Ok(Self {
            client: build_client(SOURCE_NAME)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
            convert: convert.to_uppercase(),
            interval: "daily".to_string(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_interval(mut self, interval: &str) -> Self {
        self.interval = interval.to_string();
        self
    }

    /// `ETHUSDT` -> `ETH` when quoting in USDT.
    fn base_symbol(&self, symbol: &str) -> String {
        let upper = symbol.to_uppercase();
        match upper.strip_suffix(&self.convert) {
            Some(base) if !base.is_empty() => base.to_string(),
            _ => upper,
        }
    }
}

impl PriceSource for CoinMarketCapPriceSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn fetch_prices(&self, symbol: &str, limit: usize) -> Result<PriceSeries, EthSignalError> {
        let base = self.base_symbol(symbol);
        let url = format!("{}/v2/cryptocurrency/quotes/historical", self.base_url);
        tracing::info!(symbol = %base, convert = %self.convert, limit, "fetching historical quotes");

        let resp: HistoricalResponse = get_json(SOURCE_NAME, &self.retry, || {
            self.client
                .get(&url)
                .header("X-CMC_PRO_API_KEY", &self.api_key)
                .header("Accept", "application/json")
                .query(&[
                    ("symbol", base.clone()),
                    ("convert", self.convert.clone()),
                    ("interval", self.interval.clone()),
                    ("count", limit.max(1).to_string()),
                ])
        })?;

        parse_historical(resp, &base, &self.convert)?.tail(limit.max(1))
    }
}

pub fn parse_historical(
    resp: HistoricalResponse,
    base: &str,
    convert: &str,
) -> Result<PriceSeries, EthSignalError> {
    let quotes = resp
        .data
        .into_iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(base))
        .and_then(|(_, assets)| assets.into_iter().next())
        .map(|asset| asset.quotes)
        .ok_or_else(|| {
            EthSignalError::data_source(SOURCE_NAME, format!("no data for symbol {base}"))
        })?;

    let mut points = Vec::with_capacity(quotes.len());
    for q in quotes {
        let timestamp = parse_timestamp(&q.timestamp).ok_or_else(|| {
            EthSignalError::data_source(
                SOURCE_NAME,
                format!("invalid timestamp '{}'", q.timestamp),
            )
        })?;
        let price = q
            .quote
            .get(convert)
            .and_then(|p| p.price)
            .ok_or_else(|| EthSignalError::MissingRequiredColumn {
                accepted: CLOSE_ALIASES.iter().map(|a| a.to_string()).collect(),
            })?;
        points.push(PricePoint::new(timestamp, price));
    }
    PriceSeries::from_unsorted(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> HistoricalResponse {
        serde_json::from_str(json).unwrap()
    }

    const SAMPLE: &str = r#"{
        "status": {"error_code": 0},
        "data": {
            "ETH": [{
                "id": 1027,
                "symbol": "ETH",
                "quotes": [
                    {"timestamp": "2024-01-02T00:00:00.000Z", "quote": {"USDT": {"price": 2352.75, "timestamp": "2024-01-02T00:00:00.000Z"}}},
                    {"timestamp": "2024-01-01T00:00:00.000Z", "quote": {"USDT": {"price": 2281.5, "timestamp": "2024-01-01T00:00:00.000Z"}}}
                ]
            }]
        }
    }"#;

    #[test]
    fn parses_and_orders_quotes() {
        let series = parse_historical(response(SAMPLE), "ETH", "USDT").unwrap();
        assert_eq!(series.closes(), vec![2281.5, 2352.75]);
    }

    #[test]
    fn close_key_accepted() {
        let json = r#"{"data": {"ETH": [{"quotes": [
            {"timestamp": "2024-01-01T00:00:00Z", "quote": {"USDT": {"close": 2281.5}}}
        ]}]}}"#;
        let series = parse_historical(response(json), "ETH", "USDT").unwrap();
        assert_eq!(series.closes(), vec![2281.5]);
    }

    #[test]
    fn missing_price_is_missing_column() {
        let json = r#"{"data": {"ETH": [{"quotes": [
            {"timestamp": "2024-01-01T00:00:00Z", "quote": {"USDT": {"volume_24h": 1.0}}}
        ]}]}}"#;
        let err = parse_historical(response(json), "ETH", "USDT").unwrap_err();
        assert!(matches!(err, EthSignalError::MissingRequiredColumn { .. }));
    }

    #[test]
    fn wrong_convert_is_missing_column() {
        let err = parse_historical(response(SAMPLE), "ETH", "EUR").unwrap_err();
        assert!(matches!(err, EthSignalError::MissingRequiredColumn { .. }));
    }

    #[test]
    fn unknown_symbol() {
        let err = parse_historical(response(SAMPLE), "BTC", "USDT").unwrap_err();
        assert!(matches!(err, EthSignalError::DataSource { .. }));
    }

    #[test]
    fn requires_api_key() {
        let err = CoinMarketCapPriceSource::new(DEFAULT_BASE_URL, "  ", "USDT")
            .err()
            .unwrap();
        assert!(matches!(err, EthSignalError::DataSource { .. }));
    }

    #[test]
    fn base_symbol_strips_quote_asset() {
        let source = CoinMarketCapPriceSource::new(DEFAULT_BASE_URL, "key", "usdt").unwrap();
        assert_eq!(source.base_symbol("ethusdt"), "ETH");
        assert_eq!(source.base_symbol("ETH"), "ETH");
        assert_eq!(source.base_symbol("USDT"), "USDT");
    }
}
