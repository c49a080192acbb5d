//! Per-security holdings.
//!
//! Only long positions exist. A position opens on the first buy of a
//! security, accumulates further buys at an averaged entry price, shrinks on
//! sells, and is closed once its amount reaches zero.

use rust_decimal::Decimal;
use serde::Serialize;

use super::error::TradingError;
use super::order::{Order, OrderSide};

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    security: String,
    side: OrderSide,
    amount: Decimal,
    avg_entry_price: Decimal,
    price: Decimal,
}

/// Frozen view of a position for the account history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionSnapshot {
    pub security: String,
    pub side: OrderSide,
    pub amount: Decimal,
    pub price: Decimal,
    pub unrealized_gain: Decimal,
}

impl Position {
    /// Open a position from the order that enters it.
    pub fn from_order(order: &Order) -> Self {
        Position {
            security: order.security().to_string(),
            side: order.side(),
            amount: order.amount(),
            avg_entry_price: order.price(),
            price: order.price(),
        }
    }

    /// Restore a long position from persisted state. The mark price starts at
    /// the entry price.
    pub fn long(security: impl Into<String>, amount: Decimal, avg_entry_price: Decimal) -> Self {
        Position {
            security: security.into(),
            side: OrderSide::Buy,
            amount,
            avg_entry_price,
            price: avg_entry_price,
        }
    }

    pub fn security(&self) -> &str {
        &self.security
    }

    pub fn side(&self) -> OrderSide {
        self.side
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn avg_entry_price(&self) -> Decimal {
        self.avg_entry_price
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    /// Apply an order to this position and mark it at the order's price.
    ///
    /// Buys on a long position re-average the entry price; sells reduce the
    /// amount and are rejected with `OverSell` when they exceed it, leaving
    /// the position untouched.
    pub fn execute_order(&mut self, order: &Order) -> Result<(), TradingError> {
        match (self.side, order.side()) {
            (OrderSide::Buy, OrderSide::Buy) => {
                let total_value =
                    self.avg_entry_price * self.amount + order.price() * order.amount();
                let new_amount = self.amount + order.amount();

                // A zero-amount buy on an empty position would divide by zero.
                if !new_amount.is_zero() {
                    self.avg_entry_price = total_value / new_amount;
                }
                self.amount = new_amount;
                self.price = order.price();
                Ok(())
            }
            (OrderSide::Buy, OrderSide::Sell) => {
                let remaining = self.amount - order.amount();
                if remaining < Decimal::ZERO {
                    return Err(TradingError::OverSell {
                        security: self.security.clone(),
                        requested: order.amount(),
                        held: self.amount,
                    });
                }
                self.amount = remaining;
                self.price = order.price();
                Ok(())
            }
            (position_side, order_side) => Err(TradingError::UnsupportedOperation {
                security: self.security.clone(),
                order_side,
                position_side,
            }),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn update_price(&mut self, price: Decimal) {
        self.price = price;
    }

    /// Mark-to-market value: amount * price.
    pub fn unrealized_equity(&self) -> Decimal {
        self.amount * self.price
    }

    pub fn unrealized_gain(&self) -> Decimal {
        self.amount * self.price - self.amount * self.avg_entry_price
    }

    pub fn export_snapshot(&self) -> PositionSnapshot {
        PositionSnapshot {
            security: self.security.clone(),
            side: self.side,
            amount: self.amount,
            price: self.price,
            unrealized_gain: self.unrealized_gain(),
        }
    }
}
