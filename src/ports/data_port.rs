//! Market data access port trait.

use crate::domain::candle::TimeSeries;
use crate::domain::error::TradesimError;
use chrono::NaiveDate;

pub trait DataPort {
    /// Candles for `code` between the two dates, inclusive.
    fn fetch_series(
        &self,
        code: &str,
        exchange: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<TimeSeries, TradesimError>;

    /// Precomputed entry signals aligned with `fetch_series`, or `None` when
    /// the source carries no signals.
    fn fetch_signals(
        &self,
        code: &str,
        exchange: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Option<Vec<bool>>, TradesimError>;

    /// Series and signals for `code` in one read. Sources that can load
    /// both from the same file should override this.
    fn fetch_series_with_signals(
        &self,
        code: &str,
        exchange: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<(TimeSeries, Option<Vec<bool>>), TradesimError> {
        let series = self.fetch_series(code, exchange, start_date, end_date)?;
        let signals = self.fetch_signals(code, exchange, start_date, end_date)?;
        Ok((series, signals))
    }

    /// First date, last date and row count of the stored data.
    fn get_data_range(
        &self,
        code: &str,
        exchange: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TradesimError>;
}
