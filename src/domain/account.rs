//! Trading account state: cash, open positions and the trade record.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use super::error::TradingError;
use super::order::{Order, OrderSide};
use super::period::TimePeriod;
use super::position::{Position, PositionSnapshot};

/// Current price per security for a single tick.
pub type Pricing = HashMap<String, Decimal>;

/// Frozen copy of the account at the end of a period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountSnapshot {
    pub period: TimePeriod,
    pub cash: Decimal,
    pub equity: Decimal,
    pub positions: Vec<PositionSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Account {
    cash: Decimal,
    positions: HashMap<String, Position>,
    trade_record: Vec<Order>,
}

impl Account {
    pub fn new() -> Self {
        Account::default()
    }

    pub fn with_cash(cash: Decimal) -> Self {
        Account {
            cash,
            ..Account::default()
        }
    }

    /// Restore open positions, e.g. from a persisted account. Closed
    /// positions are ignored.
    pub fn with_positions(mut self, positions: impl IntoIterator<Item = Position>) -> Self {
        for position in positions {
            if !position.is_closed() {
                self.positions
                    .insert(position.security().to_string(), position);
            }
        }
        self
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn positions(&self) -> &HashMap<String, Position> {
        &self.positions
    }

    pub fn trade_record(&self) -> &[Order] {
        &self.trade_record
    }

    pub fn open_position(&self, security: &str) -> Option<&Position> {
        self.positions.get(security)
    }

    pub fn deposit(&mut self, amount: Decimal) {
        self.cash += amount;
    }

    pub fn withdraw(&mut self, amount: Decimal) -> Result<(), TradingError> {
        let remaining = self.cash - amount;
        if remaining < Decimal::ZERO {
            return Err(TradingError::InsufficientFunds {
                needed: amount,
                available: self.cash,
            });
        }
        self.cash = remaining;
        Ok(())
    }

    /// Mark open positions to the given prices. Positions without a quote
    /// keep their last known price.
    pub fn update_prices(&mut self, prices: &Pricing) {
        for (security, position) in self.positions.iter_mut() {
            if let Some(&price) = prices.get(security) {
                position.update_price(price);
            }
        }
    }

    /// Sells always pass since the account is long only; the position checks
    /// the amount. Buys need strictly more cash than their cost basis.
    pub fn has_sufficient_funds(&self, order: &Order) -> bool {
        match order.side() {
            OrderSide::Sell => true,
            OrderSide::Buy => order.cost_basis() < self.cash,
        }
    }

    /// Cash plus the mark-to-market value of every open position.
    pub fn equity(&self) -> Decimal {
        self.cash
            + self
                .positions
                .values()
                .map(Position::unrealized_equity)
                .sum::<Decimal>()
    }

    /// Execute an order against the account.
    ///
    /// 1. Reject negative amounts or prices, and buys the cash cannot cover
    /// 2. Apply the order to the open position, dropping it once closed
    /// 3. Open a new position for a first buy; a sell with no position fails
    /// 4. Move the cost basis out of (buy) or into (sell) cash
    /// 5. Record the order
    pub fn execute_order(&mut self, order: Order) -> Result<(), TradingError> {
        if order.amount() < Decimal::ZERO || order.price() < Decimal::ZERO {
            return Err(TradingError::InvalidOrder {
                security: order.security().to_string(),
                amount: order.amount(),
                price: order.price(),
            });
        }

        if !self.has_sufficient_funds(&order) {
            return Err(TradingError::InsufficientFunds {
                needed: order.cost_basis(),
                available: self.cash,
            });
        }

        if let Some(position) = self.positions.get_mut(order.security()) {
            position.execute_order(&order)?;
            if position.is_closed() {
                self.positions.remove(order.security());
            }
        } else if order.side() == OrderSide::Buy {
            let position = Position::from_order(&order);
            if !position.is_closed() {
                self.positions.insert(order.security().to_string(), position);
            }
        } else {
            return Err(TradingError::NoPositionToSell {
                security: order.security().to_string(),
                amount: order.amount(),
            });
        }

        match order.side() {
            OrderSide::Buy => {
                self.withdraw(order.cost_basis())
                    .map_err(|e| TradingError::InvariantViolation {
                        reason: format!("validated buy failed to settle: {e}"),
                    })?
            }
            OrderSide::Sell => self.deposit(order.cost_basis()),
        }

        debug!(%order, cash = %self.cash, "order executed");
        self.trade_record.push(order);
        Ok(())
    }

    /// Positions in the snapshot are ordered by security.
    pub fn export_snapshot(&self, period: TimePeriod) -> AccountSnapshot {
        let mut positions: Vec<PositionSnapshot> = self
            .positions
            .values()
            .map(Position::export_snapshot)
            .collect();
        positions.sort_by(|a, b| a.security.cmp(&b.security));

        AccountSnapshot {
            period,
            cash: self.cash,
            equity: self.equity(),
            positions,
        }
    }
}
