//! Account history: the snapshot log a backtest leaves behind.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeSet;

use super::account::{AccountSnapshot, Pricing};
use super::error::TradingError;
use super::indicator::Indicator;
use super::period::TimePeriod;

/// Prices observed during a period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricingSnapshot {
    pub period: TimePeriod,
    pub prices: Pricing,
}

impl PricingSnapshot {
    pub fn new(period: TimePeriod, prices: Pricing) -> Self {
        PricingSnapshot { period, prices }
    }
}

/// Append-only log of account and pricing snapshot pairs. Entry `i` of both
/// logs always covers the same period.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountHistory {
    snapshots: Vec<AccountSnapshot>,
    prices: Vec<PricingSnapshot>,
    benchmark: Option<String>,
    securities: BTreeSet<String>,
}

impl AccountHistory {
    pub fn new() -> Self {
        AccountHistory::default()
    }

    pub fn with_benchmark(mut self, benchmark: impl Into<String>) -> Self {
        self.benchmark = Some(benchmark.into());
        self
    }

    pub fn set_benchmark(&mut self, benchmark: impl Into<String>) {
        self.benchmark = Some(benchmark.into());
    }

    pub fn benchmark(&self) -> Option<&str> {
        self.benchmark.as_deref()
    }

    /// Append a snapshot pair, rejecting pairs whose periods start at
    /// different instants.
    pub fn apply_snapshot(
        &mut self,
        account: AccountSnapshot,
        pricing: PricingSnapshot,
    ) -> Result<(), TradingError> {
        if account.period.start != pricing.period.start {
            return Err(TradingError::SnapshotPeriodMismatch {
                account_start: account.period.start,
                pricing_start: pricing.period.start,
            });
        }

        self.securities.extend(pricing.prices.keys().cloned());
        self.securities
            .extend(account.positions.iter().map(|p| p.security.clone()));

        self.snapshots.push(account);
        self.prices.push(pricing);
        Ok(())
    }

    pub fn snapshots(&self) -> &[AccountSnapshot] {
        &self.snapshots
    }

    pub fn prices(&self) -> &[PricingSnapshot] {
        &self.prices
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.snapshots.len().checked_sub(1)
    }

    pub fn price_at_index(&self, security: &str, index: usize) -> Option<Decimal> {
        self.prices
            .get(index)
            .and_then(|p| p.prices.get(security))
            .copied()
    }

    /// Every security that appeared in a pricing or position snapshot,
    /// in symbol order.
    pub fn securities(&self) -> impl Iterator<Item = &str> {
        self.securities.iter().map(String::as_str)
    }

    pub fn equity_indicator(&self) -> EquityIndicator {
        EquityIndicator {
            equity: self.snapshots.iter().map(|s| s.equity).collect(),
        }
    }
}

/// Account equity per history entry. Indexes past the end yield zero.
#[derive(Debug, Clone, PartialEq)]
pub struct EquityIndicator {
    equity: Vec<Decimal>,
}

impl Indicator for EquityIndicator {
    fn calculate(&self, index: usize) -> Decimal {
        self.equity.get(index).copied().unwrap_or(Decimal::ZERO)
    }
}
