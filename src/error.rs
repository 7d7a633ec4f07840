// src/error.rs

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop an allocation run.
///
/// Data-quality issues (non-numeric ranks, empty stock rows, products seen
/// in only one ledger) are corrected silently while loading and never show up
/// here.
#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Missing table '{table}' (expected file {})", .path.display())]
    MissingTable { table: String, path: PathBuf },

    #[error("Table '{table}' is missing required column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("Table '{table}', row {row}, column '{column}': invalid value '{value}'")]
    InvalidValue {
        table: String,
        row: usize,
        column: String,
        value: String,
    },

    #[error("Table '{table}', column '{column}': quantities add up past {max}")]
    Overflow {
        table: String,
        column: String,
        max: u64,
    },

    #[error("Invalid sample parameters: {0}")]
    Sample(String),

    #[error("Invariant violated: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, AllocationError>;
