//! ethsignal: ETH/USDT trading-signal backtester.
//!
//! Hexagonal architecture: the signal and portfolio engine in [`domain`],
//! port traits in [`ports`], concrete data/config/report implementations in
//! [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
