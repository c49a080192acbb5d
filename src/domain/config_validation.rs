//! Configuration validation.
//!
//! Validates all config fields before a backtest runs.

use crate::domain::error::TradesimError;
use crate::domain::universe::parse_codes;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use rust_decimal::Decimal;

pub const REPORT_FORMATS: &[&str] = &["json", "csv"];

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    validate_backtest_config(config)?;
    validate_allocator_config(config)?;
    validate_report_config(config)?;
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    validate_initial_capital(config)?;
    validate_dates(config)?;
    validate_exchange(config)?;
    validate_codes(config)?;
    validate_benchmark(config)?;
    Ok(())
}

pub fn validate_allocator_config(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    validate_fraction(config, "max_single_position")?;
    validate_fraction(config, "max_total_position")?;
    Ok(())
}

pub fn validate_report_config(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    match config.get_string("report", "format") {
        None => Ok(()),
        Some(f) if REPORT_FORMATS.contains(&f.trim().to_lowercase().as_str()) => Ok(()),
        Some(f) => Err(TradesimError::ConfigInvalid {
            section: "report".to_string(),
            key: "format".to_string(),
            reason: format!("unknown report format '{}', expected json or csv", f),
        }),
    }
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    if config.get_string("backtest", "initial_capital").is_none() {
        return Err(TradesimError::ConfigMissing {
            section: "backtest".to_string(),
            key: "initial_capital".to_string(),
        });
    }
    let value = config.get_decimal("backtest", "initial_capital", Decimal::ZERO);
    if value <= Decimal::ZERO {
        return Err(TradesimError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "initial_capital".to_string(),
            reason: "initial_capital must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_fraction(config: &dyn ConfigPort, key: &str) -> Result<(), TradesimError> {
    if config.get_string("allocator", key).is_none() {
        return Ok(());
    }
    let value = config.get_decimal("allocator", key, Decimal::ZERO);
    if value <= Decimal::ZERO || value > Decimal::ONE {
        return Err(TradesimError::ConfigInvalid {
            section: "allocator".to_string(),
            key: key.to_string(),
            reason: format!("{} must be between 0 and 1", key),
        });
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    let start_str = config.get_string("backtest", "start_date");
    let end_str = config.get_string("backtest", "end_date");

    let start_date = parse_date(start_str.as_deref(), "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "end_date")?;

    if start_date >= end_date {
        return Err(TradesimError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "start_date".to_string(),
            reason: "start_date must be before end_date".to_string(),
        });
    }
    Ok(())
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, TradesimError> {
    match value {
        None => Err(TradesimError::ConfigMissing {
            section: "backtest".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            TradesimError::ConfigInvalid {
                section: "backtest".to_string(),
                key: field.to_string(),
                reason: format!("invalid {} format, expected YYYY-MM-DD", field),
            }
        }),
    }
}

fn validate_exchange(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    match config.get_string("backtest", "exchange") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(TradesimError::ConfigMissing {
            section: "backtest".to_string(),
            key: "exchange".to_string(),
        }),
    }
}

fn validate_codes(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    match config.get_string("backtest", "codes") {
        Some(c) if !c.trim().is_empty() => {
            parse_codes(&c).map_err(|e| TradesimError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "codes".to_string(),
                reason: e.to_string(),
            })?;
            Ok(())
        }
        _ => Err(TradesimError::ConfigMissing {
            section: "backtest".to_string(),
            key: "codes".to_string(),
        }),
    }
}

/// The benchmark is priced from the loaded series, so it must be one of the
/// configured codes.
fn validate_benchmark(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    let Some(benchmark) = config.get_string("backtest", "benchmark") else {
        return Ok(());
    };
    let benchmark = benchmark.trim().to_uppercase();
    if benchmark.is_empty() {
        return Ok(());
    }

    let codes = config
        .get_string("backtest", "codes")
        .and_then(|c| parse_codes(&c).ok())
        .unwrap_or_default();
    if !codes.contains(&benchmark) {
        return Err(TradesimError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "benchmark".to_string(),
            reason: format!("benchmark {} is not in codes", benchmark),
        });
    }
    Ok(())
}
