//! Universe of securities for a multi-code backtest.
//!
//! Parses code lists from configuration and checks that the loaded series
//! line up tick for tick before they are handed to the backtest driver.

use crate::domain::error::TradesimError;
use crate::domain::strategy::Strategy;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct Universe {
    pub codes: Vec<String>,
    pub exchange: String,
}

impl Universe {
    pub fn count(&self) -> usize {
        self.codes.len()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),
}

pub fn parse_codes(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if !seen.insert(code.clone()) {
            return Err(UniverseError::DuplicateCode(code));
        }
        codes.push(code);
    }

    Ok(codes)
}

/// Every strategy must cover the same periods as the first one.
pub fn validate_alignment(strategies: &[Strategy]) -> Result<(), TradesimError> {
    let Some((reference, rest)) = strategies.split_first() else {
        return Ok(());
    };

    for strategy in rest {
        if strategy.series.len() != reference.series.len() {
            return Err(TradesimError::Misaligned {
                code: strategy.security.clone(),
                reason: format!(
                    "{} candles, {} has {}",
                    strategy.series.len(),
                    reference.security,
                    reference.series.len()
                ),
            });
        }

        let mismatch = reference
            .series
            .candles
            .iter()
            .zip(&strategy.series.candles)
            .position(|(a, b)| a.period.start != b.period.start);

        if let Some(index) = mismatch {
            return Err(TradesimError::Misaligned {
                code: strategy.security.clone(),
                reason: format!(
                    "period at index {} starts {}, {} starts {}",
                    index,
                    strategy.series.candles[index].period.start,
                    reference.security,
                    reference.series.candles[index].period.start
                ),
            });
        }
    }

    Ok(())
}
