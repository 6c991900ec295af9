//! Score sheet loading.
//!
//! Reads the companies × metrics table from a local CSV file or a
//! published spreadsheet export URL.

pub mod loader;
pub mod parser;

pub use loader::*;
pub use parser::*;

use thiserror::Error;

/// Errors raised while loading or parsing a sheet.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Sheet is empty")]
    EmptySheet,

    #[error("Company column '{0}' not found in the header")]
    MissingCompanyColumn(String),

    #[error("Metric '{0}' appears more than once in the header")]
    DuplicateMetric(String),

    #[error("Company '{0}' appears more than once")]
    DuplicateCompany(String),

    #[error("Unterminated quoted field starting on line {0}")]
    UnterminatedQuote(usize),

    #[error("Request to {url} failed with status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
