//! Concrete adapter implementations for ports.

#[cfg(feature = "http")]
pub mod binance;
#[cfg(feature = "http")]
pub mod coinmarketcap;
pub mod csv_price_source;
pub mod csv_report_adapter;
pub mod file_config_adapter;
#[cfg(feature = "http")]
pub mod http;
