//! Per-security strategy record: price data, indicators and the entry rule.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;

use super::candle::TimeSeries;
use super::indicator::Indicator;
use super::rule::Rule;

pub struct Strategy {
    pub security: String,
    pub series: TimeSeries,
    pub indicators: HashMap<String, Box<dyn Indicator>>,
    pub rule: Box<dyn Rule>,
}

impl Strategy {
    pub fn new(security: impl Into<String>, series: TimeSeries, rule: impl Rule + 'static) -> Self {
        Strategy {
            security: security.into(),
            series,
            indicators: HashMap::new(),
            rule: Box::new(rule),
        }
    }

    pub fn with_indicator(mut self, name: impl Into<String>, indicator: impl Indicator + 'static) -> Self {
        self.indicators.insert(name.into(), Box::new(indicator));
        self
    }

    pub fn indicator(&self, name: &str) -> Option<&dyn Indicator> {
        self.indicators.get(name).map(|i| i.as_ref())
    }

    pub fn last_index(&self) -> Option<usize> {
        self.series.last_index()
    }

    pub fn close_price(&self, index: usize) -> Option<Decimal> {
        self.series.get(index).map(|c| c.close)
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.indicators.keys().collect();
        names.sort();
        f.debug_struct("Strategy")
            .field("security", &self.security)
            .field("candles", &self.series.len())
            .field("indicators", &names)
            .finish()
    }
}
