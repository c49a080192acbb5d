//! Price bars and the time series that strategies iterate over.

use rust_decimal::Decimal;

use super::period::TimePeriod;

#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub period: TimePeriod,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
}

impl Candle {
    /// A candle whose every price is `close`. Handy for close-only data.
    pub fn from_close(period: TimePeriod, close: Decimal) -> Self {
        Candle {
            period,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0,
        }
    }
}

/// Ordered candles for one security, indexed by tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    pub candles: Vec<Candle>,
}

impl TimeSeries {
    pub fn new() -> Self {
        TimeSeries::default()
    }

    /// Append a candle if it starts after the current last candle.
    /// Returns whether the candle was added.
    pub fn add_candle(&mut self, candle: Candle) -> bool {
        if let Some(last) = self.candles.last() {
            if candle.period.start <= last.period.start {
                return false;
            }
        }
        self.candles.push(candle);
        true
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.candles.len().checked_sub(1)
    }

    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }
}

impl FromIterator<Candle> for TimeSeries {
    fn from_iter<I: IntoIterator<Item = Candle>>(iter: I) -> Self {
        let mut series = TimeSeries::new();
        for candle in iter {
            series.add_candle(candle);
        }
        series
    }
}
