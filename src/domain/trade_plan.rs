//! Trade plans: the orders that move an account onto a target allocation.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::account::{Account, Pricing};
use super::allocator::Allocations;
use super::error::TradingError;
use super::order::Order;

/// Orders to be executed in the order they appear.
pub type TradePlan = Vec<Order>;

/// Whole shares that `cash` buys at `price`. Zero for a zero price or
/// non-positive cash.
pub fn cash_to_shares(price: Decimal, cash: Decimal) -> Decimal {
    if price.is_zero() || cash <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    cash.checked_div(price)
        .map(|shares| shares.floor())
        .unwrap_or(Decimal::ZERO)
}

/// Diff the target allocations against the account's open positions.
///
/// Sizing uses the account's current equity. Open positions with no
/// allocation are sold out entirely. All sells come before all buys so the
/// cash they free is available to the buys; within each group orders are
/// sorted by security.
pub fn create_trade_plan(
    allocations: &Allocations,
    pricing: &Pricing,
    account: &Account,
) -> Result<TradePlan, TradingError> {
    let equity = account.equity();
    let mut share_diffs: BTreeMap<&str, Decimal> = BTreeMap::new();

    for (security, fraction) in allocations {
        let price = pricing
            .get(security)
            .ok_or_else(|| TradingError::MissingPricingData {
                security: security.clone(),
            })?;

        let target = cash_to_shares(*price, *fraction * equity);
        let held = account
            .open_position(security)
            .map(|p| p.amount())
            .unwrap_or(Decimal::ZERO);

        share_diffs.insert(security.as_str(), target - held);
    }

    for (security, position) in account.positions() {
        share_diffs
            .entry(security.as_str())
            .or_insert(-position.amount());
    }

    let mut sells = Vec::new();
    let mut buys = Vec::new();
    for (security, diff) in share_diffs {
        if diff.is_zero() {
            continue;
        }
        let price = pricing
            .get(security)
            .ok_or_else(|| TradingError::MissingPricingData {
                security: security.to_string(),
            })?;

        if diff < Decimal::ZERO {
            sells.push(Order::sell(security, diff.abs(), *price));
        } else {
            buys.push(Order::buy(security, diff, *price));
        }
    }

    sells.extend(buys);
    Ok(sells)
}
