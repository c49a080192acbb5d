//! JSON report adapter implementing ReportPort.
//!
//! Every report is a single pretty-printed JSON document.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;

use crate::adapters::{export_error, prepare_output};
use crate::domain::account::AccountSnapshot;
use crate::domain::analysis::{AnalysisSummary, ReturnPeriod};
use crate::domain::error::TradesimError;
use crate::domain::history::{AccountHistory, PricingSnapshot};
use crate::ports::report_port::ReportPort;

pub struct JsonReportAdapter;

#[derive(Serialize)]
struct SnapshotEntry<'a> {
    #[serde(flatten)]
    account: &'a AccountSnapshot,
    prices: BTreeMap<&'a str, Decimal>,
}

impl<'a> SnapshotEntry<'a> {
    fn new(account: &'a AccountSnapshot, pricing: &'a PricingSnapshot) -> Self {
        SnapshotEntry {
            account,
            prices: pricing
                .prices
                .iter()
                .map(|(security, price)| (security.as_str(), *price))
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct SnapshotDocument<'a> {
    benchmark: Option<&'a str>,
    securities: Vec<&'a str>,
    snapshots: Vec<SnapshotEntry<'a>>,
}

impl JsonReportAdapter {
    pub fn new() -> Self {
        JsonReportAdapter
    }

    fn write_json<T: Serialize>(value: &T, output_path: &str) -> Result<(), TradesimError> {
        prepare_output(output_path)?;
        let json = serde_json::to_string_pretty(value).map_err(|e| export_error(output_path, e))?;
        fs::write(output_path, json).map_err(|e| export_error(output_path, e))
    }
}

impl Default for JsonReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for JsonReportAdapter {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn write_snapshots(
        &self,
        history: &AccountHistory,
        output_path: &str,
    ) -> Result<(), TradesimError> {
        let document = SnapshotDocument {
            benchmark: history.benchmark(),
            securities: history.securities().collect(),
            snapshots: history
                .snapshots()
                .iter()
                .zip(history.prices())
                .map(|(account, pricing)| SnapshotEntry::new(account, pricing))
                .collect(),
        };
        Self::write_json(&document, output_path)
    }

    fn write_summary(
        &self,
        summary: &AnalysisSummary,
        output_path: &str,
    ) -> Result<(), TradesimError> {
        Self::write_json(summary, output_path)
    }

    fn write_monthly_returns(
        &self,
        returns: &[ReturnPeriod],
        output_path: &str,
    ) -> Result<(), TradesimError> {
        Self::write_json(&returns, output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::{Account, Pricing};
    use crate::domain::order::Order;
    use crate::domain::period::TimePeriod;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn sample_history() -> AccountHistory {
        let mut history = AccountHistory::new().with_benchmark("ONE");
        let mut account = Account::with_cash(dec!(100));
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        for day in 0..3 {
            let period = TimePeriod::new(start + Duration::days(day), Duration::days(1));
            if day == 1 {
                account
                    .execute_order(Order::buy("ONE", dec!(10), dec!(2)))
                    .unwrap();
            }
            let prices = Pricing::from([("ONE".to_string(), Decimal::from(2 + day))]);
            account.update_prices(&prices);
            history
                .apply_snapshot(
                    account.export_snapshot(period),
                    PricingSnapshot::new(period, prices),
                )
                .unwrap();
        }
        history
    }

    fn read_json(path: &std::path::Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn writes_snapshots_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshots.json");
        let adapter = JsonReportAdapter::new();

        adapter
            .write_snapshots(&sample_history(), path.to_str().unwrap())
            .unwrap();

        let doc = read_json(&path);
        assert_eq!(doc["benchmark"], "ONE");
        assert_eq!(doc["securities"], serde_json::json!(["ONE"]));
        let snapshots = doc["snapshots"].as_array().unwrap();
        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots[2]["prices"]["ONE"], "4");
        assert_eq!(snapshots[2]["positions"][0]["security"], "ONE");
        assert_eq!(snapshots[2]["positions"][0]["side"], "BUY");
        assert!(snapshots[0]["period"]["start"].is_string());
    }

    #[test]
    fn writes_summary_and_monthly_returns() {
        let dir = TempDir::new().unwrap();
        let history = sample_history();
        let adapter = JsonReportAdapter::new();

        let summary_path = dir.path().join("summary.json");
        adapter
            .write_summary(&history.summary().unwrap(), summary_path.to_str().unwrap())
            .unwrap();
        let summary = read_json(&summary_path);
        assert_eq!(summary["starting_equity"], "100");
        assert_eq!(summary["benchmark"], "ONE");

        let monthly_path = dir.path().join("monthly.json");
        adapter
            .write_monthly_returns(
                &history.monthly_percent_gains(),
                monthly_path.to_str().unwrap(),
            )
            .unwrap();
        let monthly = read_json(&monthly_path);
        assert_eq!(monthly.as_array().unwrap().len(), 1);
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("monthly.json");

        JsonReportAdapter::new()
            .write_monthly_returns(&[], path.to_str().unwrap())
            .unwrap();
        assert_eq!(read_json(&path), serde_json::json!([]));
    }

    #[test]
    fn unwritable_path_is_export_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let path = blocker.join("summary.json");

        let err = JsonReportAdapter::new()
            .write_monthly_returns(&[], path.to_str().unwrap())
            .unwrap_err();
        assert!(matches!(err, TradesimError::Export { .. }));
    }
}
