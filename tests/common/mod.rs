#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tradesim::cli::{BacktestSettings, ReportFormat};
use tradesim::domain::candle::{Candle, TimeSeries};
use tradesim::domain::error::TradesimError;
use tradesim::domain::period::TimePeriod;
use tradesim::domain::universe::Universe;
use tradesim::ports::data_port::DataPort;

pub struct MockDataPort {
    pub series: HashMap<String, TimeSeries>,
    pub signals: HashMap<String, Vec<bool>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            series: HashMap::new(),
            signals: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_series(mut self, code: &str, series: TimeSeries) -> Self {
        self.series.insert(code.to_string(), series);
        self
    }

    pub fn with_signals(mut self, code: &str, signals: Vec<bool>) -> Self {
        self.signals.insert(code.to_string(), signals);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }

    fn check(&self, code: &str) -> Result<(), TradesimError> {
        match self.errors.get(code) {
            Some(reason) => Err(TradesimError::Data {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl DataPort for MockDataPort {
    fn fetch_series(
        &self,
        code: &str,
        exchange: &str,
        _start_date: NaiveDate,
        _end_date: NaiveDate,
    ) -> Result<TimeSeries, TradesimError> {
        self.check(code)?;
        self.series
            .get(code)
            .cloned()
            .ok_or_else(|| TradesimError::NoData {
                code: code.to_string(),
                exchange: exchange.to_string(),
            })
    }

    fn fetch_signals(
        &self,
        code: &str,
        _exchange: &str,
        _start_date: NaiveDate,
        _end_date: NaiveDate,
    ) -> Result<Option<Vec<bool>>, TradesimError> {
        self.check(code)?;
        Ok(self.signals.get(code).cloned())
    }

    fn get_data_range(
        &self,
        code: &str,
        _exchange: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TradesimError> {
        self.check(code)?;
        match self.series.get(code) {
            Some(series) if !series.is_empty() => {
                let first = series.candles.first().unwrap().period.start.date_naive();
                let last = series.candles.last().unwrap().period.start.date_naive();
                Ok(Some((first, last, series.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn day_period(d: NaiveDate) -> TimePeriod {
    TimePeriod::new(d.and_hms_opt(0, 0, 0).unwrap().and_utc(), Duration::days(1))
}

/// Daily series with one candle per close, starting on `start`.
pub fn make_series(start: NaiveDate, closes: &[Decimal]) -> TimeSeries {
    closes
        .iter()
        .enumerate()
        .map(|(i, close)| Candle::from_close(day_period(start + Duration::days(i as i64)), *close))
        .collect()
}

/// Closes rising by one each day from `start_price`.
pub fn rising_closes(start_price: Decimal, count: usize) -> Vec<Decimal> {
    (0..count)
        .map(|i| start_price + Decimal::from(i as i64))
        .collect()
}

pub fn sample_settings(codes: &[&str]) -> BacktestSettings {
    BacktestSettings {
        initial_capital: dec!(10000),
        start_date: date(2024, 1, 1),
        end_date: date(2024, 12, 31),
        universe: Universe {
            codes: codes.iter().map(|c| c.to_string()).collect(),
            exchange: "ASX".to_string(),
        },
        data_dir: PathBuf::from("data"),
        benchmark: None,
        max_single_position: dec!(0.5),
        max_total_position: dec!(0.95),
        fresh_entries_only: false,
        report_format: ReportFormat::Json,
        output_dir: PathBuf::from("."),
    }
}

/// Write `<CODE>_<EXCHANGE>.csv` with one row per close, starting on `start`.
/// Signals, when given, add a trailing `signal` column.
pub fn write_csv(
    dir: &Path,
    code: &str,
    exchange: &str,
    start: NaiveDate,
    closes: &[Decimal],
    signals: Option<&[bool]>,
) -> PathBuf {
    let mut content = String::from("date,open,high,low,close,volume");
    if signals.is_some() {
        content.push_str(",signal");
    }
    content.push('\n');

    for (i, close) in closes.iter().enumerate() {
        let day = start + Duration::days(i as i64);
        content.push_str(&format!(
            "{},{},{},{},{},1000",
            day.format("%Y-%m-%d"),
            close,
            close,
            close,
            close
        ));
        if let Some(signals) = signals {
            content.push_str(if signals[i] { ",1" } else { ",0" });
        }
        content.push('\n');
    }

    let path = dir.join(format!("{}_{}.csv", code, exchange));
    fs::write(&path, content).unwrap();
    path
}

pub fn write_ini(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("tradesim.ini");
    fs::write(&path, content).unwrap();
    path
}
