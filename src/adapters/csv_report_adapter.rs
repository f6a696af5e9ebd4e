//! CSV export of the simulation step series, one row per period, for
//! charting price, portfolio value and trade markers outside the process.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::EthSignalError;
use crate::ports::report_port::ReportPort;
use std::io::Write;
use std::path::Path;

pub const HEADER: [&str; 7] = [
    "timestamp",
    "close",
    "action",
    "executed",
    "cash",
    "position",
    "portfolio_value",
];

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn write_to<W: Write>(&self, result: &BacktestResult, out: W) -> Result<(), EthSignalError> {
        let mut wtr = csv::Writer::from_writer(out);
        wtr.write_record(HEADER).map_err(csv_err)?;
        for step in &result.steps {
            wtr.write_record([
                step.timestamp.format("%Y-%m-%dT%H:%M:%S").to_string(),
                step.close.to_string(),
                step.action.to_string(),
                step.executed.to_string(),
                format!("{:.2}", step.cash),
                format!("{:.8}", step.position),
                format!("{:.2}", step.portfolio_value),
            ])
            .map_err(csv_err)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn csv_err(e: csv::Error) -> EthSignalError {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => EthSignalError::Io(io),
        other => EthSignalError::Io(std::io::Error::other(format!("{other:?}"))),
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), EthSignalError> {
        let file = std::fs::File::create(output_path)?;
        self.write_to(result, file)?;
        tracing::info!(path = %output_path.display(), rows = result.steps.len(), "wrote step report");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::run_with;
    use crate::domain::price::{PricePoint, PriceSeries};
    use crate::domain::strategy::MaCrossover;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn sample_result() -> BacktestResult {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let series = PriceSeries::new(
            [1.0, 2.0, 3.0, 4.0, 5.0, 3.0, 1.0]
                .iter()
                .enumerate()
                .map(|(i, &c)| PricePoint::new(start + chrono::Duration::days(i as i64), c))
                .collect(),
        )
        .unwrap();
        run_with(&series, &MaCrossover::new(2, 4).unwrap(), 1000.0).unwrap()
    }

    #[test]
    fn writes_header_and_rows() {
        let mut buf = Vec::new();
        CsvReportAdapter::new()
            .write_to(&sample_result(), &mut buf)
            .unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 8);
        assert_eq!(
            lines[0],
            "timestamp,close,action,executed,cash,position,portfolio_value"
        );
        assert_eq!(lines[1], "2024-01-01T00:00:00,1,NONE,false,1000.00,0.00000000,1000.00");
        assert_eq!(lines[4], "2024-01-04T00:00:00,4,BUY,true,0.00,250.00000000,1000.00");
    }

    #[test]
    fn writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("steps.csv");
        CsvReportAdapter::new()
            .write(&sample_result(), &path)
            .unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("timestamp,"));
        assert_eq!(content.lines().count(), 8);
    }

    #[test]
    fn unwritable_path_is_io_error() {
        let err = CsvReportAdapter::new()
            .write(&sample_result(), Path::new("/nonexistent/dir/steps.csv"))
            .unwrap_err();
        assert!(matches!(err, EthSignalError::Io(_)));
    }
}
