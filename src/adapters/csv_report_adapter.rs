//! CSV report adapter implementing ReportPort.
//!
//! Snapshots are written one row per history entry with a price column per
//! tracked security. The summary is a single row; monthly returns are one
//! row per month.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::adapters::{export_error, prepare_output};
use crate::domain::analysis::{AnalysisSummary, ReturnPeriod};
use crate::domain::error::TradesimError;
use crate::domain::history::AccountHistory;
use crate::ports::report_port::ReportPort;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub struct CsvReportAdapter;

#[derive(Serialize)]
struct MonthlyRow {
    month: String,
    total_profit: Decimal,
    percent_gain: Decimal,
}

impl CsvReportAdapter {
    pub fn new() -> Self {
        CsvReportAdapter
    }

    fn writer(output_path: &str) -> Result<csv::Writer<std::fs::File>, TradesimError> {
        prepare_output(output_path)?;
        csv::Writer::from_path(output_path).map_err(|e| export_error(output_path, e))
    }
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for CsvReportAdapter {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn write_snapshots(
        &self,
        history: &AccountHistory,
        output_path: &str,
    ) -> Result<(), TradesimError> {
        let securities: Vec<&str> = history.securities().collect();
        let mut wtr = Self::writer(output_path)?;

        let mut header = vec![
            "period_start".to_string(),
            "period_end".to_string(),
            "cash".to_string(),
            "equity".to_string(),
            "open_positions".to_string(),
        ];
        header.extend(securities.iter().map(|s| format!("price_{}", s)));
        wtr.write_record(&header)
            .map_err(|e| export_error(output_path, e))?;

        for (index, snapshot) in history.snapshots().iter().enumerate() {
            let mut row = vec![
                snapshot.period.start.format(TIMESTAMP_FORMAT).to_string(),
                snapshot.period.end.format(TIMESTAMP_FORMAT).to_string(),
                snapshot.cash.to_string(),
                snapshot.equity.to_string(),
                snapshot.positions.len().to_string(),
            ];
            row.extend(securities.iter().map(|s| {
                history
                    .price_at_index(s, index)
                    .map(|p| p.to_string())
                    .unwrap_or_default()
            }));
            wtr.write_record(&row)
                .map_err(|e| export_error(output_path, e))?;
        }

        wtr.flush().map_err(|e| export_error(output_path, e))
    }

    fn write_summary(
        &self,
        summary: &AnalysisSummary,
        output_path: &str,
    ) -> Result<(), TradesimError> {
        let mut wtr = Self::writer(output_path)?;
        wtr.serialize(summary)
            .map_err(|e| export_error(output_path, e))?;
        wtr.flush().map_err(|e| export_error(output_path, e))
    }

    fn write_monthly_returns(
        &self,
        returns: &[ReturnPeriod],
        output_path: &str,
    ) -> Result<(), TradesimError> {
        let mut wtr = Self::writer(output_path)?;
        if returns.is_empty() {
            wtr.write_record(["month", "total_profit", "percent_gain"])
                .map_err(|e| export_error(output_path, e))?;
        }
        for r in returns {
            wtr.serialize(MonthlyRow {
                month: r.period.start.format("%Y-%m").to_string(),
                total_profit: r.total_profit,
                percent_gain: r.percent_gain,
            })
            .map_err(|e| export_error(output_path, e))?;
        }
        wtr.flush().map_err(|e| export_error(output_path, e))
    }
}
