//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod csv_report_adapter;
pub mod file_config_adapter;
pub mod json_report_adapter;

use crate::domain::error::TradesimError;
use std::fs;
use std::path::Path;

pub(crate) fn export_error(path: &str, err: impl std::fmt::Display) -> TradesimError {
    TradesimError::Export {
        path: path.to_string(),
        reason: err.to_string(),
    }
}

/// Create the parent directory of a report path if needed.
pub(crate) fn prepare_output(output_path: &str) -> Result<(), TradesimError> {
    if let Some(parent) = Path::new(output_path).parent() {
        fs::create_dir_all(parent).map_err(|e| export_error(output_path, e))?;
    }
    Ok(())
}
