use thiserror::Error;

#[derive(Error, Debug)]
pub enum VarianceError {
    #[error("Column '{column}' not found. Available columns: {available}")]
    MissingColumn { column: String, available: String },

    #[error("Input table has {0} columns; at least 3 are required (account, current, prior)")]
    TooFewColumns(usize),

    #[error("'{first}' and '{second}' both resolve to column {index}; header names must be unique")]
    AmbiguousColumns {
        first: String,
        second: String,
        index: usize,
    },

    #[error("Workbook has no worksheets")]
    EmptyWorkbook,

    #[error("Invalid {name} threshold {value}: must be a finite, non-negative number")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Explanation request failed: {0}")]
    ExplanationFailed(String),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    SpreadsheetError(#[from] calamine::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[cfg(feature = "openai")]
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, VarianceError>;
