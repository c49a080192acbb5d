//! CSV file market data adapter.
//!
//! Reads `<base_path>/<CODE>_<EXCHANGE>.csv` with the columns
//! `date,open,high,low,close,volume` and an optional trailing `signal`
//! column. Each row becomes a daily candle.

use crate::domain::candle::{Candle, TimeSeries};
use crate::domain::error::TradesimError;
use crate::domain::period::TimePeriod;
use crate::ports::data_port::DataPort;
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

pub struct CsvAdapter {
    base_path: PathBuf,
}

struct Row {
    date: NaiveDate,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: i64,
    signal: Option<bool>,
}

impl Row {
    fn into_candle(self) -> Result<Candle, TradesimError> {
        let start = self
            .date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| TradesimError::Data {
                reason: format!("invalid date {}", self.date),
            })?
            .and_utc();

        Ok(Candle {
            period: TimePeriod::new(start, Duration::days(1)),
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        })
    }
}

fn field<'a>(record: &'a csv::StringRecord, index: usize, name: &str) -> Result<&'a str, TradesimError> {
    record
        .get(index)
        .map(str::trim)
        .ok_or_else(|| TradesimError::Data {
            reason: format!("missing {} column", name),
        })
}

fn parse_decimal(record: &csv::StringRecord, index: usize, name: &str) -> Result<Decimal, TradesimError> {
    let raw = field(record, index, name)?;
    Decimal::from_str(raw).map_err(|e| TradesimError::Data {
        reason: format!("invalid {} value '{}': {}", name, raw, e),
    })
}

fn parse_price(record: &csv::StringRecord, index: usize, name: &str) -> Result<Decimal, TradesimError> {
    let value = parse_decimal(record, index, name)?;
    if value < Decimal::ZERO {
        return Err(TradesimError::Data {
            reason: format!("negative {} value '{}'", name, value),
        });
    }
    Ok(value)
}

fn parse_signal(raw: &str) -> Result<bool, TradesimError> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        other => Err(TradesimError::Data {
            reason: format!("invalid signal value '{}'", other),
        }),
    }
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str, exchange: &str) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", code, exchange))
    }

    /// Rows in date order with duplicate dates dropped, optionally limited
    /// to an inclusive date range. `Ok(None)` when the file does not exist.
    fn read_rows(
        &self,
        code: &str,
        exchange: &str,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Option<Vec<Row>>, TradesimError> {
        let path = self.csv_path(code, exchange);
        if !path.exists() {
            return Ok(None);
        }

        let mut rdr = csv::Reader::from_path(&path).map_err(|e| TradesimError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let signal_column = rdr
            .headers()
            .map_err(|e| TradesimError::Data {
                reason: format!("CSV header error in {}: {}", path.display(), e),
            })?
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case("signal"));

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| TradesimError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = field(&record, 0, "date")?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                TradesimError::Data {
                    reason: format!("invalid date format '{}': {}", date_str, e),
                }
            })?;

            if let Some((start, end)) = range {
                if date < start || date > end {
                    continue;
                }
            }

            let volume_str = field(&record, 5, "volume")?;
            let volume: i64 = volume_str.parse().map_err(|e| TradesimError::Data {
                reason: format!("invalid volume value '{}': {}", volume_str, e),
            })?;

            let signal = match signal_column {
                Some(index) => Some(parse_signal(record.get(index).unwrap_or("").trim())?),
                None => None,
            };

            rows.push(Row {
                date,
                open: parse_price(&record, 1, "open")?,
                high: parse_price(&record, 2, "high")?,
                low: parse_price(&record, 3, "low")?,
                close: parse_price(&record, 4, "close")?,
                volume,
                signal,
            });
        }

        rows.sort_by_key(|r| r.date);
        rows.dedup_by_key(|r| r.date);
        debug!(code, exchange, rows = rows.len(), path = %path.display(), "loaded csv data");
        Ok(Some(rows))
    }

    fn require_rows(
        &self,
        code: &str,
        exchange: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Row>, TradesimError> {
        self.read_rows(code, exchange, Some((start_date, end_date)))?
            .ok_or_else(|| TradesimError::NoData {
                code: code.to_string(),
                exchange: exchange.to_string(),
            })
    }
}

fn rows_to_series(rows: Vec<Row>) -> Result<TimeSeries, TradesimError> {
    let mut series = TimeSeries::new();
    for row in rows {
        series.add_candle(row.into_candle()?);
    }
    Ok(series)
}

impl DataPort for CsvAdapter {
    fn fetch_series(
        &self,
        code: &str,
        exchange: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<TimeSeries, TradesimError> {
        let rows = self.require_rows(code, exchange, start_date, end_date)?;
        rows_to_series(rows)
    }

    fn fetch_signals(
        &self,
        code: &str,
        exchange: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Option<Vec<bool>>, TradesimError> {
        let rows = self.require_rows(code, exchange, start_date, end_date)?;
        Ok(rows.iter().map(|r| r.signal).collect())
    }

    fn fetch_series_with_signals(
        &self,
        code: &str,
        exchange: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<(TimeSeries, Option<Vec<bool>>), TradesimError> {
        let rows = self.require_rows(code, exchange, start_date, end_date)?;
        let signals = rows.iter().map(|r| r.signal).collect();
        Ok((rows_to_series(rows)?, signals))
    }

    fn get_data_range(
        &self,
        code: &str,
        exchange: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TradesimError> {
        let Some(rows) = self.read_rows(code, exchange, None)? else {
            return Ok(None);
        };
        match (rows.first(), rows.last()) {
            (Some(first), Some(last)) => Ok(Some((first.date, last.date, rows.len()))),
            _ => Ok(None),
        }
    }
}
