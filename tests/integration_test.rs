//! Integration tests for the simulation pipeline.
//!
//! Tests cover:
//! - Trade plans built from public account, allocation and pricing values
//! - Full pipeline with MockDataPort (load, align, simulate)
//! - History analysis on recorded runs
//! - CsvAdapter data feeding a run whose results go through both report writers

mod common;

use common::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fs;
use tradesim::cli::{run_backtest_pipeline, write_reports, ReportFormat};
use tradesim::domain::account::{Account, Pricing};
use tradesim::domain::allocator::Allocations;
use tradesim::domain::error::{TradesimError, TradingError};
use tradesim::domain::history::{AccountHistory, PricingSnapshot};
use tradesim::domain::order::OrderSide;
use tradesim::domain::position::Position;
use tradesim::domain::trade_plan::create_trade_plan;

mod trade_plans {
    use super::*;

    #[test]
    fn half_allocation_from_cash_buys_five() {
        let account = Account::with_cash(dec!(10));
        let allocations = Allocations::from([("ONE".to_string(), dec!(0.5))]);
        let pricing = Pricing::from([("ONE".to_string(), dec!(1))]);

        let plan = create_trade_plan(&allocations, &pricing, &account).unwrap();

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].side(), OrderSide::Buy);
        assert_eq!(plan[0].security(), "ONE");
        assert_eq!(plan[0].amount(), dec!(5));
        assert_eq!(plan[0].price(), dec!(1));
    }

    #[test]
    fn empty_allocation_sells_everything() {
        let account =
            Account::with_cash(dec!(0)).with_positions([Position::long("ONE", dec!(5), dec!(1))]);
        let pricing = Pricing::from([("ONE".to_string(), dec!(1))]);

        let plan = create_trade_plan(&Allocations::new(), &pricing, &account).unwrap();

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].side(), OrderSide::Sell);
        assert_eq!(plan[0].amount(), dec!(5));
    }

    #[test]
    fn executing_a_plan_conserves_value() {
        let mut account =
            Account::with_cash(dec!(100)).with_positions([Position::long("OLD", dec!(10), dec!(5))]);
        let allocations = Allocations::from([("NEW".to_string(), dec!(0.5))]);
        let pricing = Pricing::from([
            ("OLD".to_string(), dec!(5)),
            ("NEW".to_string(), dec!(3)),
        ]);
        account.update_prices(&pricing);
        let before = account.equity();

        let plan = create_trade_plan(&allocations, &pricing, &account).unwrap();
        assert_eq!(plan.first().map(|o| o.side()), Some(OrderSide::Sell));
        for order in plan {
            account.execute_order(order).unwrap();
        }

        assert_eq!(account.equity(), before);
        assert!(account.open_position("OLD").is_none());
        assert_eq!(account.open_position("NEW").unwrap().amount(), dec!(25));
    }
}

mod full_backtest_pipeline {
    use super::*;

    #[test]
    fn buy_and_hold_single_code() {
        let port = MockDataPort::new().with_series(
            "ONE",
            make_series(date(2024, 1, 2), &rising_closes(dec!(10), 5)),
        );
        let settings = sample_settings(&["ONE"]);

        let history = run_backtest_pipeline(&port, &settings).unwrap();

        assert_eq!(history.len(), 6);
        assert_eq!(history.snapshots()[0].equity, dec!(10000));
        assert_eq!(history.snapshots()[1].positions[0].amount, dec!(500));
        assert!(history.total_profit() > Decimal::ZERO);

        for snapshot in history.snapshots() {
            let held: Decimal = snapshot.positions.iter().map(|p| p.amount * p.price).sum();
            assert_eq!(snapshot.equity, snapshot.cash + held);
        }
    }

    #[test]
    fn signal_column_drives_exits() {
        let port = MockDataPort::new()
            .with_series("ONE", make_series(date(2024, 1, 2), &rising_closes(dec!(10), 5)))
            .with_signals("ONE", vec![true, true, false, false, false]);
        let settings = sample_settings(&["ONE"]);

        let history = run_backtest_pipeline(&port, &settings).unwrap();
        let last = history.snapshots().last().unwrap();

        assert!(last.positions.is_empty());
        assert_eq!(last.cash, last.equity);
        assert!(last.equity > dec!(10000));
    }

    #[test]
    fn multiple_codes_share_the_account() {
        let port = MockDataPort::new()
            .with_series("AAA", make_series(date(2024, 1, 2), &rising_closes(dec!(10), 4)))
            .with_series("BBB", make_series(date(2024, 1, 2), &rising_closes(dec!(20), 4)));
        let mut settings = sample_settings(&["AAA", "BBB"]);
        settings.max_single_position = dec!(0.4);
        settings.max_total_position = dec!(0.8);

        let history = run_backtest_pipeline(&port, &settings).unwrap();
        let first_tick = &history.snapshots()[1];

        assert_eq!(first_tick.positions.len(), 2);
        assert_eq!(first_tick.positions[0].security, "AAA");
        assert_eq!(first_tick.positions[0].amount, dec!(400));
        assert_eq!(first_tick.positions[1].amount, dec!(200));
        assert_eq!(first_tick.cash, dec!(2000));
        assert_eq!(history.securities().collect::<Vec<_>>(), vec!["AAA", "BBB"]);
    }

    #[test]
    fn benchmark_follows_first_priced_snapshot() {
        let port = MockDataPort::new().with_series(
            "ONE",
            make_series(date(2024, 1, 2), &rising_closes(dec!(10), 5)),
        );
        let mut settings = sample_settings(&["ONE"]);
        settings.benchmark = Some("ONE".to_string());

        let history = run_backtest_pipeline(&port, &settings).unwrap();

        assert_eq!(history.benchmark(), Some("ONE"));
        assert_eq!(history.benchmark_buy_hold_percent_gain(), dec!(40));
        assert_eq!(history.benchmark_buy_hold_total_profit(), dec!(4000));
    }

    #[test]
    fn fresh_entries_only_ignores_stale_signal() {
        let port = MockDataPort::new()
            .with_series("ONE", make_series(date(2024, 1, 2), &rising_closes(dec!(10), 3)))
            .with_signals("ONE", vec![true, true, true]);
        let mut settings = sample_settings(&["ONE"]);
        settings.fresh_entries_only = true;

        let history = run_backtest_pipeline(&port, &settings).unwrap();

        assert_eq!(history.snapshots()[1].positions.len(), 1);
        assert_eq!(history.snapshots()[3].positions.len(), 1);
    }

    #[test]
    fn misaligned_series_are_rejected() {
        let port = MockDataPort::new()
            .with_series("AAA", make_series(date(2024, 1, 2), &rising_closes(dec!(10), 4)))
            .with_series("BBB", make_series(date(2024, 1, 3), &rising_closes(dec!(10), 4)));
        let settings = sample_settings(&["AAA", "BBB"]);

        let err = run_backtest_pipeline(&port, &settings).unwrap_err();
        assert!(matches!(err, TradesimError::Misaligned { code, .. } if code == "BBB"));
    }

    #[test]
    fn empty_series_is_no_data() {
        let port = MockDataPort::new().with_series("ONE", make_series(date(2024, 1, 2), &[]));
        let settings = sample_settings(&["ONE"]);

        let err = run_backtest_pipeline(&port, &settings).unwrap_err();
        assert!(matches!(err, TradesimError::NoData { code, .. } if code == "ONE"));
    }

    #[test]
    fn data_errors_propagate() {
        let port = MockDataPort::new()
            .with_series("ONE", make_series(date(2024, 1, 2), &rising_closes(dec!(10), 3)))
            .with_error("TWO", "disk on fire");
        let settings = sample_settings(&["ONE", "TWO"]);

        let err = run_backtest_pipeline(&port, &settings).unwrap_err();
        assert!(matches!(err, TradesimError::Data { reason } if reason == "disk on fire"));
    }

    #[test]
    fn full_allocation_aborts_with_insufficient_funds() {
        let port = MockDataPort::new().with_series(
            "ONE",
            make_series(date(2024, 1, 2), &rising_closes(dec!(10), 3)),
        );
        let mut settings = sample_settings(&["ONE"]);
        settings.max_single_position = dec!(1);
        settings.max_total_position = dec!(1);

        let err = run_backtest_pipeline(&port, &settings).unwrap_err();
        assert!(matches!(
            err,
            TradesimError::Trading(TradingError::InsufficientFunds { .. })
        ));
    }
}

mod history_analysis {
    use super::*;

    fn history_from_equities(equities: &[Decimal]) -> AccountHistory {
        let mut history = AccountHistory::new();
        for (i, equity) in equities.iter().enumerate() {
            let period = day_period(date(2024, 3, 1) + chrono::Duration::days(i as i64));
            history
                .apply_snapshot(
                    Account::with_cash(*equity).export_snapshot(period),
                    PricingSnapshot::new(period, Pricing::new()),
                )
                .unwrap();
        }
        history
    }

    #[test]
    fn doubling_equity() {
        let history = history_from_equities(&[dec!(1), dec!(2)]);
        assert_eq!(history.total_profit(), dec!(1));
        assert_eq!(history.percent_gain(), dec!(100));
    }

    #[test]
    fn volatility_of_four_days() {
        let history = history_from_equities(&[dec!(100), dec!(105), dec!(102), dec!(107)]);
        let vol: f64 = history.annualized_volatility().to_string().parse().unwrap();
        approx::assert_abs_diff_eq!(vol, 11.36, epsilon = 0.5);
    }

    #[test]
    fn export_snapshot_is_idempotent() {
        let account =
            Account::with_cash(dec!(50)).with_positions([Position::long("ONE", dec!(2), dec!(3))]);
        let period = day_period(date(2024, 3, 1));
        assert_eq!(account.export_snapshot(period), account.export_snapshot(period));
    }

    #[test]
    fn mismatched_periods_are_rejected() {
        let mut history = AccountHistory::new();
        let err = history
            .apply_snapshot(
                Account::with_cash(dec!(1)).export_snapshot(day_period(date(2024, 3, 1))),
                PricingSnapshot::new(day_period(date(2024, 3, 2)), Pricing::new()),
            )
            .unwrap_err();

        assert!(matches!(err, TradingError::SnapshotPeriodMismatch { .. }));
        assert!(history.is_empty());
    }

    #[test]
    fn summary_matches_individual_metrics() {
        let history = history_from_equities(&[dec!(100), dec!(90), dec!(120)]);
        let summary = history.summary().unwrap();

        assert_eq!(summary.starting_equity, dec!(100));
        assert_eq!(summary.ending_equity, dec!(120));
        assert_eq!(summary.total_profit, dec!(20));
        assert_eq!(summary.percent_gain, dec!(20));
        assert_eq!(summary.max_drawdown, dec!(10));
        assert_eq!(summary.benchmark, None);
    }
}

mod csv_data_to_reports {
    use super::*;
    use tradesim::adapters::csv_adapter::CsvAdapter;

    fn run_from_csv(dir: &std::path::Path) -> AccountHistory {
        write_csv(dir, "AAA", "ASX", date(2024, 1, 30), &rising_closes(dec!(10), 4), None);
        write_csv(
            dir,
            "BBB",
            "ASX",
            date(2024, 1, 30),
            &[dec!(5), dec!(6), dec!(5), dec!(7)],
            Some(&[true, false, true, true]),
        );

        let mut settings = sample_settings(&["AAA", "BBB"]);
        settings.benchmark = Some("AAA".to_string());
        settings.max_single_position = dec!(0.4);
        let port = CsvAdapter::new(dir.to_path_buf());
        run_backtest_pipeline(&port, &settings).unwrap()
    }

    #[test]
    fn json_reports_are_written() {
        let data = tempfile::TempDir::new().unwrap();
        let out = tempfile::TempDir::new().unwrap();
        let history = run_from_csv(data.path());
        let summary = history.summary().unwrap();

        let writer = ReportFormat::Json.writer();
        let paths = write_reports(&history, &summary, writer.as_ref(), out.path()).unwrap();

        assert_eq!(paths.len(), 3);
        assert!(paths.iter().all(|p| p.exists()));

        let snapshots: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&paths[0]).unwrap()).unwrap();
        assert_eq!(snapshots["benchmark"], "AAA");
        assert_eq!(snapshots["snapshots"].as_array().unwrap().len(), 5);

        let summary_json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&paths[1]).unwrap()).unwrap();
        assert_eq!(summary_json["starting_equity"], "10000");

        let monthly: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&paths[2]).unwrap()).unwrap();
        assert_eq!(monthly.as_array().unwrap().len(), 2);
    }

    #[test]
    fn csv_reports_are_written() {
        let data = tempfile::TempDir::new().unwrap();
        let out = tempfile::TempDir::new().unwrap();
        let history = run_from_csv(data.path());
        let summary = history.summary().unwrap();

        let writer = ReportFormat::Csv.writer();
        let paths = write_reports(&history, &summary, writer.as_ref(), out.path()).unwrap();

        assert_eq!(paths[0].file_name().unwrap(), "snapshots.csv");
        let snapshots = fs::read_to_string(&paths[0]).unwrap();
        let mut lines = snapshots.lines();
        assert_eq!(
            lines.next().unwrap(),
            "period_start,period_end,cash,equity,open_positions,price_AAA,price_BBB"
        );
        assert_eq!(lines.count(), 5);

        let monthly = fs::read_to_string(&paths[2]).unwrap();
        assert!(monthly.starts_with("month,total_profit,percent_gain"));
        assert!(monthly.contains("2024-01"));
        assert!(monthly.contains("2024-02"));
    }
}
