//! Domain and application error types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::order::OrderSide;

/// Errors raised by the simulation engine. These are deterministic logic
/// failures and are always returned to the immediate caller.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TradingError {
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    #[error("cannot sell {amount} of {security}: no open position")]
    NoPositionToSell { security: String, amount: Decimal },

    #[error("cannot sell {requested} of {security}: position holds {held}")]
    OverSell {
        security: String,
        requested: Decimal,
        held: Decimal,
    },

    #[error("unsupported {order_side} order on {position_side} position in {security}")]
    UnsupportedOperation {
        security: String,
        order_side: OrderSide,
        position_side: OrderSide,
    },

    #[error("invalid order for {security}: amount {amount} at price {price}")]
    InvalidOrder {
        security: String,
        amount: Decimal,
        price: Decimal,
    },

    #[error("no pricing data for {security}")]
    MissingPricingData { security: String },

    #[error("snapshot period mismatch: account starts {account_start}, pricing starts {pricing_start}")]
    SnapshotPeriodMismatch {
        account_start: DateTime<Utc>,
        pricing_start: DateTime<Utc>,
    },

    #[error("account invariant violated: {reason}")]
    InvariantViolation { reason: String },

    #[error("backtest has no strategy data to iterate")]
    NoStrategyData,
}

/// Top-level error type for tradesim.
#[derive(Debug, thiserror::Error)]
pub enum TradesimError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {code} on {exchange}")]
    NoData { code: String, exchange: String },

    #[error("misaligned series for {code}: {reason}")]
    Misaligned { code: String, reason: String },

    #[error(transparent)]
    Trading(#[from] TradingError),

    #[error("failed to export {path}: {reason}")]
    Export { path: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TradesimError> for std::process::ExitCode {
    fn from(err: &TradesimError) -> Self {
        let code: u8 = match err {
            TradesimError::Io(_) | TradesimError::Export { .. } => 1,
            TradesimError::ConfigParse { .. }
            | TradesimError::ConfigMissing { .. }
            | TradesimError::ConfigInvalid { .. } => 2,
            TradesimError::Data { .. } | TradesimError::NoData { .. } => 3,
            TradesimError::Misaligned { .. } => 4,
            TradesimError::Trading(_) => 5,
        };
        std::process::ExitCode::from(code)
    }
}
