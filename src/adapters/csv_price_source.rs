//! CSV file price source.
//!
//! Expects a header row. The timestamp column may be named `date`,
//! `timestamp` or `time`; the close column `close` or `price`. Other
//! columns are ignored.

use crate::domain::error::EthSignalError;
use crate::domain::price::{find_close_column, PricePoint, PriceSeries};
use crate::ports::price_source::PriceSource;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::io::Read;
use std::path::PathBuf;

const SOURCE_NAME: &str = "csv";
pub const TIMESTAMP_ALIASES: [&str; 3] = ["date", "timestamp", "time"];

pub struct CsvPriceSource {
    path: PathBuf,
}

impl CsvPriceSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl PriceSource for CsvPriceSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn fetch_prices(&self, symbol: &str, limit: usize) -> Result<PriceSeries, EthSignalError> {
        tracing::debug!(path = %self.path.display(), symbol, "reading prices from csv");
        let file = std::fs::File::open(&self.path).map_err(|e| {
            EthSignalError::data_source(
                SOURCE_NAME,
                format!("failed to open {}: {}", self.path.display(), e),
            )
        })?;
        parse_prices(file)?.tail(limit)
    }
}

/// Parse a price CSV from any reader. Rows are sorted by timestamp.
pub fn parse_prices<R: Read>(reader: R) -> Result<PriceSeries, EthSignalError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| EthSignalError::data_source(SOURCE_NAME, format!("CSV header error: {e}")))?
        .clone();

    let ts_col = headers
        .iter()
        .position(|h| TIMESTAMP_ALIASES.contains(&h.trim().to_ascii_lowercase().as_str()))
        .ok_or_else(|| EthSignalError::MissingRequiredColumn {
            accepted: TIMESTAMP_ALIASES.iter().map(|a| a.to_string()).collect(),
        })?;
    let close_col = find_close_column(headers.iter())?;

    let mut points = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result
            .map_err(|e| EthSignalError::data_source(SOURCE_NAME, format!("CSV parse error: {e}")))?;

        let ts_str = record.get(ts_col).unwrap_or_default();
        let timestamp = parse_timestamp(ts_str).ok_or_else(|| {
            EthSignalError::data_source(
                SOURCE_NAME,
                format!("row {}: invalid timestamp '{}'", row + 1, ts_str),
            )
        })?;

        let close_str = record.get(close_col).unwrap_or_default().trim();
        let close: f64 = close_str.parse().map_err(|e| {
            EthSignalError::data_source(
                SOURCE_NAME,
                format!("row {}: invalid close '{}': {}", row + 1, close_str, e),
            )
        })?;

        points.push(PricePoint::new(timestamp, close));
    }

    PriceSeries::from_unsorted(points)
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`,
/// `YYYY-MM-DD`, or a unix epoch in seconds or milliseconds.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    if let Ok(epoch) = value.parse::<i64>() {
        // anything past 1e11 seconds is far in the future; treat as millis
        let dt = if epoch.abs() >= 100_000_000_000 {
            DateTime::from_timestamp_millis(epoch)
        } else {
            DateTime::from_timestamp(epoch, 0)
        };
        return dt.map(|d| d.naive_utc());
    }
    None
}
