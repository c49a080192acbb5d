//! Report generation port trait.

use crate::domain::analysis::{AnalysisSummary, ReturnPeriod};
use crate::domain::error::TradesimError;
use crate::domain::history::AccountHistory;

/// Port for writing backtest results. Every write targets the path it is
/// given and replaces any existing file.
pub trait ReportPort {
    /// File extension for paths produced by this writer, without the dot.
    fn extension(&self) -> &'static str;

    fn write_snapshots(&self, history: &AccountHistory, output_path: &str)
        -> Result<(), TradesimError>;

    fn write_summary(&self, summary: &AnalysisSummary, output_path: &str)
        -> Result<(), TradesimError>;

    fn write_monthly_returns(
        &self,
        returns: &[ReturnPeriod],
        output_path: &str,
    ) -> Result<(), TradesimError>;
}
