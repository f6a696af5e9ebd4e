//! Price points and the validated, chronologically ordered price series.

use chrono::NaiveDateTime;
use std::ops::Deref;

use super::error::EthSignalError;

/// Accepted header names for the close-price field.
pub const CLOSE_ALIASES: [&str; 2] = ["close", "price"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub timestamp: NaiveDateTime,
    pub close: f64,
}

impl PricePoint {
    pub fn new(timestamp: NaiveDateTime, close: f64) -> Self {
        PricePoint { timestamp, close }
    }
}

/// Percentage change from `prev` to `curr`, as a fraction.
pub fn pct_change(prev: f64, curr: f64) -> f64 {
    (curr - prev) / prev
}

/// Non-empty sequence of price points with strictly increasing timestamps
/// and finite positive closes. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(points: Vec<PricePoint>) -> Result<Self, EthSignalError> {
        if points.is_empty() {
            return Err(EthSignalError::EmptySeries);
        }
        for (index, point) in points.iter().enumerate() {
            if !point.close.is_finite() || point.close <= 0.0 {
                return Err(EthSignalError::InvalidPrice {
                    index,
                    value: point.close,
                });
            }
            if index > 0 && point.timestamp <= points[index - 1].timestamp {
                return Err(EthSignalError::UnorderedTimestamps { index });
            }
        }
        Ok(PriceSeries { points })
    }

    /// Sorts the points by timestamp before validating. Duplicate timestamps
    /// still fail.
    pub fn from_unsorted(mut points: Vec<PricePoint>) -> Result<Self, EthSignalError> {
        points.sort_by_key(|p| p.timestamp);
        Self::new(points)
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn last(&self) -> &PricePoint {
        // non-empty by construction
        &self.points[self.points.len() - 1]
    }

    /// Keep only the most recent `count` points.
    pub fn tail(self, count: usize) -> Result<Self, EthSignalError> {
        let skip = self.points.len().saturating_sub(count);
        Self::new(self.points.into_iter().skip(skip).collect())
    }

    pub fn into_points(self) -> Vec<PricePoint> {
        self.points
    }
}

impl Deref for PriceSeries {
    type Target = [PricePoint];

    fn deref(&self) -> &[PricePoint] {
        &self.points
    }
}

/// Locate the close-price column in a header row, accepting either alias.
pub fn find_close_column<'a, I>(headers: I) -> Result<usize, EthSignalError>
where
    I: IntoIterator<Item = &'a str>,
{
    let names: Vec<String> = headers
        .into_iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .collect();
    CLOSE_ALIASES
        .iter()
        .find_map(|alias| names.iter().position(|n| n == alias))
        .ok_or_else(|| EthSignalError::MissingRequiredColumn {
            accepted: CLOSE_ALIASES.iter().map(|a| a.to_string()).collect(),
        })
}
