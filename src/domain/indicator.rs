//! Indicator contract.
//!
//! An indicator is a random-access numeric series keyed by tick index. The
//! simulation never computes indicators itself; strategies carry whatever
//! indicators their rules were built from.

use rust_decimal::Decimal;

use super::candle::TimeSeries;

pub trait Indicator {
    fn calculate(&self, index: usize) -> Decimal;
}

impl<F> Indicator for F
where
    F: Fn(usize) -> Decimal,
{
    fn calculate(&self, index: usize) -> Decimal {
        self(index)
    }
}

/// Close prices of a series. Indexes past the end yield zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosePriceIndicator {
    closes: Vec<Decimal>,
}

impl ClosePriceIndicator {
    pub fn new(series: &TimeSeries) -> Self {
        ClosePriceIndicator {
            closes: series.candles.iter().map(|c| c.close).collect(),
        }
    }
}

impl Indicator for ClosePriceIndicator {
    fn calculate(&self, index: usize) -> Decimal {
        self.closes.get(index).copied().unwrap_or(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantIndicator(pub Decimal);

impl Indicator for ConstantIndicator {
    fn calculate(&self, _index: usize) -> Decimal {
        self.0
    }
}
