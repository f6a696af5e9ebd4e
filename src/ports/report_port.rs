//! Report generation port.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::EthSignalError;
use std::path::Path;

/// Port for writing backtest results somewhere outside the process.
pub trait ReportPort {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), EthSignalError>;
}
