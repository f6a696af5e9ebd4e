//! Core engine: features, signals, portfolio replay. Pure, no I/O.

pub mod price;
pub mod features;
pub mod signal;
pub mod sentiment;
pub mod strategy;
pub mod simulator;
pub mod metrics;
pub mod backtest;
pub mod config_validation;
pub mod error;
