//! Core domain types and simulation logic.

pub mod account;
pub mod allocator;
pub mod analysis;
pub mod backtest;
pub mod candle;
pub mod config_validation;
pub mod error;
pub mod history;
pub mod indicator;
pub mod order;
pub mod period;
pub mod position;
pub mod rule;
pub mod strategy;
pub mod trade_plan;
pub mod universe;
