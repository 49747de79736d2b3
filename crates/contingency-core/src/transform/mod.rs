//! Transform module - turns the raw contingency extract into the bot sample.
//!
//! Reads the CSV extract, keeps the configured columns, masks the
//! product number, sorts by identification number and writes the result
//! as XLSX (or CSV for lookup).

pub mod mask;
pub mod order;
pub mod table;

pub use mask::mask_product_number;
pub use order::compare_ids;
pub use table::Table;

use crate::config::TransformConfig;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Column '{column}' not found in input")]
    MissingColumn { column: String },

    #[error("Delimiter must be a single ASCII character, got '{0}'")]
    InvalidDelimiter(char),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformReport {
    pub rows: usize,
    pub output: PathBuf,
}

/// Run the whole transform described by `config`.
pub fn run(config: &TransformConfig) -> Result<TransformReport, TransformError> {
    let delimiter = u8::try_from(config.delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or(TransformError::InvalidDelimiter(config.delimiter))?;

    tracing::info!("Reading {}", config.input.display());
    let table = Table::read_csv(&config.input, delimiter)?;

    let mut sample = table.project(&config.columns)?;
    sample.mask_column(&config.mask_column)?;
    sample.sort_by_column(&config.sort_column)?;
    sample.save(&config.output, &[config.mask_column.as_str()])?;

    tracing::info!("Wrote {} rows to {}", sample.rows.len(), config.output.display());
    Ok(TransformReport {
        rows: sample.rows.len(),
        output: config.output.clone(),
    })
}
