//! Report generation port trait.

use crate::domain::backtest::BacktestRun;
use crate::domain::error::TradesimError;
use crate::domain::metrics::BacktestSummary;

/// Port for writing backtest results.
pub trait ReportPort {
    fn write(
        &self,
        run: &BacktestRun,
        summary: &BacktestSummary,
        output_dir: &str,
    ) -> Result<(), TradesimError>;
}
