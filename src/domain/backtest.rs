//! Backtest driver: the tick loop over aligned strategies.
//!
//! Each tick prices every strategy at its close, marks the account to
//! market, asks the allocator for target fractions, turns them into a trade
//! plan and applies the orders. The resulting account and pricing snapshots
//! are appended to the history. The first failing tick aborts the run and
//! leaves the snapshots recorded so far in place.

use tracing::{debug, info, warn};

use super::account::{Account, Pricing};
use super::allocator::Allocator;
use super::error::TradingError;
use super::history::{AccountHistory, PricingSnapshot};
use super::strategy::Strategy;
use super::trade_plan::create_trade_plan;

pub struct Backtest {
    tick: usize,
    last_index: usize,
    strategies: Vec<Strategy>,
    allocator: Box<dyn Allocator>,
    account: Account,
    history: AccountHistory,
    account_aware: bool,
    finished: bool,
}

impl std::fmt::Debug for Backtest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backtest")
            .field("tick", &self.tick)
            .field("last_index", &self.last_index)
            .field("account", &self.account)
            .field("history", &self.history)
            .field("account_aware", &self.account_aware)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl Backtest {
    /// Set up a backtest at tick 0. All strategies are expected to share the
    /// same periods as the first one.
    ///
    /// The history starts with a baseline snapshot of the account one period
    /// before the first candle, with no prices.
    pub fn new(
        strategies: Vec<Strategy>,
        allocator: Box<dyn Allocator>,
        account: Account,
    ) -> Result<Self, TradingError> {
        let first = strategies.first().ok_or(TradingError::NoStrategyData)?;
        let first_candle = first.series.get(0).ok_or(TradingError::NoStrategyData)?;
        let last_index = first.last_index().ok_or(TradingError::NoStrategyData)?;

        let baseline = first_candle.period.advance(-1);
        let mut history = AccountHistory::new();
        history.apply_snapshot(
            account.export_snapshot(baseline),
            PricingSnapshot::new(baseline, Pricing::new()),
        )?;

        Ok(Backtest {
            tick: 0,
            last_index,
            strategies,
            allocator,
            account,
            history,
            account_aware: false,
            finished: false,
        })
    }

    /// Allocate with the account in view, so stale signals do not open new
    /// positions.
    pub fn with_account_aware_allocation(mut self) -> Self {
        self.account_aware = true;
        self
    }

    pub fn with_benchmark(mut self, benchmark: impl Into<String>) -> Self {
        self.history.set_benchmark(benchmark);
        self
    }

    pub fn tick(&self) -> usize {
        self.tick
    }

    pub fn last_index(&self) -> usize {
        self.last_index
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn history(&self) -> &AccountHistory {
        &self.history
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn into_history(self) -> AccountHistory {
        self.history
    }

    fn pricing_at(&self, tick: usize) -> Result<Pricing, TradingError> {
        self.strategies
            .iter()
            .map(|s| {
                s.close_price(tick)
                    .map(|price| (s.security.clone(), price))
                    .ok_or_else(|| TradingError::MissingPricingData {
                        security: s.security.clone(),
                    })
            })
            .collect()
    }

    /// Run the strategies for the current tick.
    pub fn execute_tick(&mut self) -> Result<(), TradingError> {
        let period = self
            .strategies
            .first()
            .and_then(|s| s.series.get(self.tick))
            .map(|c| c.period)
            .ok_or(TradingError::NoStrategyData)?;
        let pricing = self.pricing_at(self.tick)?;

        self.account.update_prices(&pricing);

        let allocations = if self.account_aware {
            self.allocator
                .allocate_with_account(self.tick, &self.strategies, &self.account)
        } else {
            self.allocator.allocate(self.tick, &self.strategies)
        };

        let plan = create_trade_plan(&allocations, &pricing, &self.account)?;
        debug!(tick = self.tick, orders = plan.len(), "executing trade plan");

        for order in plan {
            self.account
                .execute_order(order.with_timestamp(period.start))?;
        }

        self.history.apply_snapshot(
            self.account.export_snapshot(period),
            PricingSnapshot::new(period, pricing),
        )
    }

    /// Move to the next tick, staying on the last one once reached.
    pub fn advance_tick(&mut self) {
        if self.tick < self.last_index {
            self.tick += 1;
        }
    }

    /// Execute every remaining tick and return the history. Calling `run`
    /// again after it finished returns the same history without re-running.
    pub fn run(&mut self) -> Result<&AccountHistory, TradingError> {
        if self.finished {
            return Ok(&self.history);
        }

        loop {
            if let Err(e) = self.execute_tick() {
                warn!(tick = self.tick, error = %e, "backtest aborted");
                return Err(e);
            }
            if self.tick >= self.last_index {
                break;
            }
            self.advance_tick();
        }

        self.finished = true;
        info!(
            ticks = self.last_index + 1,
            orders = self.account.trade_record().len(),
            equity = %self.account.equity(),
            "backtest complete"
        );
        Ok(&self.history)
    }
}
