//! Performance statistics over an account history.
//!
//! All statistics are pure reads. Ratios that are undefined for an empty or
//! single-entry history come back as zero. Percentages are scaled by 100.
//! Roots and powers go through `f64` and are converted back to `Decimal`.

use chrono::{DateTime, Datelike, Months, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::Serialize;

use super::history::AccountHistory;
use super::period::TimePeriod;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const SECONDS_PER_YEAR: f64 = 365.0 * 24.0 * 60.0 * 60.0;
const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Profit over one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnPeriod {
    pub period: TimePeriod,
    pub total_profit: Decimal,
    pub percent_gain: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub starting_equity: Decimal,
    pub ending_equity: Decimal,
    pub total_profit: Decimal,
    pub percent_gain: Decimal,
    pub annualized_return: Decimal,
    pub annualized_volatility: Decimal,
    pub max_drawdown: Decimal,
    pub benchmark: Option<String>,
    pub benchmark_percent_gain: Decimal,
    pub benchmark_total_profit: Decimal,
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
}

fn percent(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    (part / whole * HUNDRED).normalize()
}

fn month_period(start: DateTime<Utc>) -> Option<TimePeriod> {
    let first = start.date_naive().with_day(1)?;
    let next = first.checked_add_months(Months::new(1))?;
    Some(TimePeriod {
        start: first.and_hms_opt(0, 0, 0)?.and_utc(),
        end: next.and_hms_opt(0, 0, 0)?.and_utc(),
    })
}

impl AccountHistory {
    fn first_equity(&self) -> Decimal {
        self.snapshots()
            .first()
            .map(|s| s.equity)
            .unwrap_or(Decimal::ZERO)
    }

    fn last_equity(&self) -> Decimal {
        self.snapshots()
            .last()
            .map(|s| s.equity)
            .unwrap_or(Decimal::ZERO)
    }

    /// Last equity minus first equity.
    pub fn total_profit(&self) -> Decimal {
        self.last_equity() - self.first_equity()
    }

    pub fn percent_gain(&self) -> Decimal {
        percent(self.total_profit(), self.first_equity())
    }

    /// Compound annual growth between the first and last entries, with years
    /// measured in 365-day units between their period starts.
    pub fn annualized_return(&self) -> Decimal {
        let (Some(first), Some(last)) = (self.snapshots().first(), self.snapshots().last()) else {
            return Decimal::ZERO;
        };

        let seconds = (last.period.start - first.period.start).num_seconds() as f64;
        let years = seconds / SECONDS_PER_YEAR;
        if years <= 0.0 || first.equity <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        if last.equity <= Decimal::ZERO {
            return -HUNDRED;
        }

        let (Some(start), Some(end)) = (first.equity.to_f64(), last.equity.to_f64()) else {
            return Decimal::ZERO;
        };
        to_decimal(((end / start).powf(1.0 / years) - 1.0) * 100.0)
    }

    /// Sample standard deviation of entry-to-entry returns, scaled by the
    /// number of trading days in a year.
    pub fn annualized_volatility(&self) -> Decimal {
        let equity: Vec<f64> = self
            .snapshots()
            .iter()
            .filter_map(|s| s.equity.to_f64())
            .collect();

        let returns: Vec<f64> = equity
            .windows(2)
            .filter(|w| w[0] != 0.0)
            .map(|w| (w[1] - w[0]) / w[0])
            .collect();
        if returns.len() < 2 {
            return Decimal::ZERO;
        }

        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
        if variance <= 0.0 {
            return Decimal::ZERO;
        }

        to_decimal(variance.sqrt() * TRADING_DAYS_PER_YEAR)
    }

    /// Largest peak-to-trough equity decline, as a percentage of the peak.
    pub fn max_drawdown(&self) -> Decimal {
        let mut peak = Decimal::ZERO;
        let mut max_dd = Decimal::ZERO;

        for snapshot in self.snapshots() {
            if snapshot.equity > peak {
                peak = snapshot.equity;
            }
            if peak > Decimal::ZERO {
                let dd = percent(peak - snapshot.equity, peak);
                if dd > max_dd {
                    max_dd = dd;
                }
            }
        }
        max_dd
    }

    /// Profit per calendar month. Each month is measured from the previous
    /// month's closing equity; the first month from its own first equity.
    pub fn monthly_percent_gains(&self) -> Vec<ReturnPeriod> {
        let snapshots = self.snapshots();
        if snapshots.len() < 2 {
            return Vec::new();
        }

        let mut months: Vec<(TimePeriod, Decimal, Decimal)> = Vec::new();
        for snapshot in snapshots {
            let Some(month) = month_period(snapshot.period.start) else {
                continue;
            };
            match months.last_mut() {
                Some((current, _, close)) if *current == month => *close = snapshot.equity,
                _ => months.push((month, snapshot.equity, snapshot.equity)),
            }
        }

        let mut result = Vec::with_capacity(months.len());
        let mut previous_close: Option<Decimal> = None;
        for (period, open, close) in months {
            let baseline = previous_close.unwrap_or(open);
            let total_profit = close - baseline;
            result.push(ReturnPeriod {
                period,
                total_profit,
                percent_gain: percent(total_profit, baseline),
            });
            previous_close = Some(close);
        }
        result
    }

    /// Benchmark prices at the first entry that prices it and at the last
    /// entry. `None` when there is no benchmark or either price is missing
    /// or zero.
    fn benchmark_prices(&self) -> Option<(Decimal, Decimal)> {
        let benchmark = self.benchmark()?;
        let last = self.last_index()?;

        let start = (0..=last)
            .filter_map(|i| self.price_at_index(benchmark, i))
            .find(|p| !p.is_zero())?;
        let end = self
            .price_at_index(benchmark, last)
            .filter(|p| !p.is_zero())?;
        Some((start, end))
    }

    pub fn benchmark_buy_hold_percent_gain(&self) -> Decimal {
        match self.benchmark_prices() {
            Some((start, end)) => percent(end - start, start),
            None => Decimal::ZERO,
        }
    }

    /// Profit of putting the starting equity into the benchmark and holding.
    pub fn benchmark_buy_hold_total_profit(&self) -> Decimal {
        match self.benchmark_prices() {
            Some((start, end)) => self.first_equity() * (end - start) / start,
            None => Decimal::ZERO,
        }
    }

    pub fn summary(&self) -> Option<AnalysisSummary> {
        let first = self.snapshots().first()?;
        let last = self.snapshots().last()?;

        Some(AnalysisSummary {
            start: first.period.start,
            end: last.period.end,
            starting_equity: first.equity,
            ending_equity: last.equity,
            total_profit: self.total_profit(),
            percent_gain: self.percent_gain(),
            annualized_return: self.annualized_return(),
            annualized_volatility: self.annualized_volatility(),
            max_drawdown: self.max_drawdown(),
            benchmark: self.benchmark().map(str::to_string),
            benchmark_percent_gain: self.benchmark_buy_hold_percent_gain(),
            benchmark_total_profit: self.benchmark_buy_hold_total_profit(),
        })
    }
}
