//! Price data acquisition port.
//!
//! Implementations may retry or block internally but must hand the engine a
//! single, chronologically ordered [`PriceSeries`].

use crate::domain::error::EthSignalError;
use crate::domain::price::PriceSeries;

pub trait PriceSource {
    fn name(&self) -> &str;

    /// The most recent `limit` closes for `symbol`, oldest first.
    fn fetch_prices(&self, symbol: &str, limit: usize) -> Result<PriceSeries, EthSignalError>;
}

/// Which price source the dispatcher should build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceKind {
    Csv,
    #[default]
    Binance,
    CoinMarketCap,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [
        SourceKind::Csv,
        SourceKind::Binance,
        SourceKind::CoinMarketCap,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Csv => "csv",
            SourceKind::Binance => "binance",
            SourceKind::CoinMarketCap => "coinmarketcap",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = EthSignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        SourceKind::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| EthSignalError::InvalidConfiguration {
                reason: format!("unknown source '{s}' (expected csv, binance or coinmarketcap)"),
            })
    }
}
