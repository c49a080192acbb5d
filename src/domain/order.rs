//! Buy and sell instructions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// An instruction to trade `amount` of `security` at `price`. Orders are
/// immutable once built; `with_timestamp` produces a stamped copy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    side: OrderSide,
    security: String,
    price: Decimal,
    amount: Decimal,
    timestamp: Option<DateTime<Utc>>,
}

impl Order {
    pub fn new(side: OrderSide, security: impl Into<String>, amount: Decimal, price: Decimal) -> Self {
        Order {
            side,
            security: security.into(),
            price,
            amount,
            timestamp: None,
        }
    }

    pub fn buy(security: impl Into<String>, amount: Decimal, price: Decimal) -> Self {
        Order::new(OrderSide::Buy, security, amount, price)
    }

    pub fn sell(security: impl Into<String>, amount: Decimal, price: Decimal) -> Self {
        Order::new(OrderSide::Sell, security, amount, price)
    }

    pub fn with_timestamp(self, timestamp: DateTime<Utc>) -> Self {
        Order {
            timestamp: Some(timestamp),
            ..self
        }
    }

    pub fn side(&self) -> OrderSide {
        self.side
    }

    pub fn security(&self) -> &str {
        &self.security
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// amount * price
    pub fn cost_basis(&self) -> Decimal {
        self.amount * self.price
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} @ {}",
            self.side, self.amount, self.security, self.price
        )
    }
}
