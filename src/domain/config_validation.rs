//! Configuration validation.
//!
//! Validates all config fields before a run.

use crate::domain::backtest::DEFAULT_INITIAL_CASH;
use crate::domain::error::EthSignalError;
use crate::domain::features::DEFAULT_WINDOW;
use crate::domain::strategy::{StrategyKind, DEFAULT_LONG_WINDOW, DEFAULT_SHORT_WINDOW};
use crate::ports::config_port::ConfigPort;
use crate::ports::price_source::SourceKind;

pub const DEFAULT_LIMIT: i64 = 100;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), EthSignalError> {
    validate_initial_cash(config)?;
    validate_strategy(config)?;
    validate_windows(config)?;
    validate_source(config)?;
    validate_limit(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> EthSignalError {
    EthSignalError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_initial_cash(config: &dyn ConfigPort) -> Result<(), EthSignalError> {
    let value = config.get_double("backtest", "initial_cash", DEFAULT_INITIAL_CASH);
    if value.is_nan() || value <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_cash",
            "initial_cash must be positive",
        ));
    }
    Ok(())
}

fn validate_strategy(config: &dyn ConfigPort) -> Result<(), EthSignalError> {
    match config.get_nonempty("backtest", "strategy") {
        None => Ok(()),
        Some(s) => s
            .parse::<StrategyKind>()
            .map(|_| ())
            .map_err(|e| invalid("backtest", "strategy", e.to_string())),
    }
}

fn validate_windows(config: &dyn ConfigPort) -> Result<(), EthSignalError> {
    let window = config.get_int("backtest", "window", DEFAULT_WINDOW as i64);
    if window < 1 {
        return Err(invalid("backtest", "window", "window must be at least 1"));
    }

    let short = config.get_int("backtest", "short_window", DEFAULT_SHORT_WINDOW as i64);
    if short < 1 {
        return Err(invalid(
            "backtest",
            "short_window",
            "short_window must be at least 1",
        ));
    }
    let long = config.get_int("backtest", "long_window", DEFAULT_LONG_WINDOW as i64);
    if short >= long {
        return Err(invalid(
            "backtest",
            "short_window",
            "short_window must be less than long_window",
        ));
    }
    Ok(())
}

fn validate_source(config: &dyn ConfigPort) -> Result<(), EthSignalError> {
    let source = match config.get_nonempty("data", "source") {
        None => SourceKind::default(),
        Some(s) => s
            .parse::<SourceKind>()
            .map_err(|e| invalid("data", "source", e.to_string()))?,
    };

    if source == SourceKind::Csv && config.get_nonempty("data", "path").is_none() {
        return Err(EthSignalError::ConfigMissing {
            section: "data".to_string(),
            key: "path".to_string(),
        });
    }
    Ok(())
}

fn validate_limit(config: &dyn ConfigPort) -> Result<(), EthSignalError> {
    let limit = config.get_int("data", "limit", DEFAULT_LIMIT);
    if limit < 1 {
        return Err(invalid("data", "limit", "limit must be at least 1"));
    }
    Ok(())
}
