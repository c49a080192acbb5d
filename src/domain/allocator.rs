//! Portfolio allocators.
//!
//! An allocator turns the rules of a set of strategies into target portfolio
//! fractions per security. The trade-plan builder then sizes orders against
//! those fractions without re-normalizing them.

use rust_decimal::Decimal;
use std::collections::HashMap;

use super::account::Account;
use super::strategy::Strategy;

/// Target fraction of account equity per security.
pub type Allocations = HashMap<String, Decimal>;

pub trait Allocator {
    fn allocate(&self, index: usize, strategies: &[Strategy]) -> Allocations;

    /// Allocation that may take the account's open positions into account.
    /// Defaults to `allocate`.
    fn allocate_with_account(
        &self,
        index: usize,
        strategies: &[Strategy],
        _account: &Account,
    ) -> Allocations {
        self.allocate(index, strategies)
    }
}

/// Splits the total cap evenly across every triggered strategy, limited by
/// the single-position cap.
///
/// The per-trigger fraction is `min(total / triggers, single)`. When fewer
/// strategies trigger than `total / single`, the allocated sum stays below
/// the total cap.
#[derive(Debug, Clone, PartialEq)]
pub struct NaiveAllocator {
    max_single_position: Decimal,
    max_total_position: Decimal,
}

impl NaiveAllocator {
    /// Caps above 1.0 are clamped to 1.0, and the single cap never exceeds
    /// the total cap.
    pub fn new(max_single_position: Decimal, max_total_position: Decimal) -> Self {
        let max_total = max_total_position.min(Decimal::ONE);
        let max_single = max_single_position.min(Decimal::ONE).min(max_total);

        NaiveAllocator {
            max_single_position: max_single,
            max_total_position: max_total,
        }
    }

    pub fn max_single_position(&self) -> Decimal {
        self.max_single_position
    }

    pub fn max_total_position(&self) -> Decimal {
        self.max_total_position
    }

    fn fraction(&self, triggers: usize) -> Decimal {
        (self.max_total_position / Decimal::from(triggers)).min(self.max_single_position)
    }
}

impl Allocator for NaiveAllocator {
    fn allocate(&self, index: usize, strategies: &[Strategy]) -> Allocations {
        let triggers: Vec<&str> = strategies
            .iter()
            .filter(|s| s.rule.is_satisfied(index))
            .map(|s| s.security.as_str())
            .collect();

        if triggers.is_empty() {
            return Allocations::new();
        }

        let fraction = self.fraction(triggers.len());
        triggers
            .into_iter()
            .map(|security| (security.to_string(), fraction))
            .collect()
    }

    /// Only keeps a trigger if the account already holds it or the rule has
    /// just turned on, so a signal that has been on for a while does not open
    /// a late position. The fraction is still computed over every trigger.
    fn allocate_with_account(
        &self,
        index: usize,
        strategies: &[Strategy],
        account: &Account,
    ) -> Allocations {
        if index == 0 {
            return self.allocate(index, strategies);
        }

        let triggered: Vec<&Strategy> = strategies
            .iter()
            .filter(|s| s.rule.is_satisfied(index))
            .collect();

        if triggered.is_empty() {
            return Allocations::new();
        }

        let fraction = self.fraction(triggered.len());
        triggered
            .into_iter()
            .filter(|s| {
                account.open_position(&s.security).is_some() || !s.rule.is_satisfied(index - 1)
            })
            .map(|s| (s.security.clone(), fraction))
            .collect()
    }
}
