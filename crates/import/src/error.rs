use chrono::NaiveDate;
use thiserror::Error;

/// Low-level reasons a statement could not be read at all.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("No columns to parse: the statement is empty")]
    NoData,
    #[error("Invalid date on line {line}: '{value}'")]
    InvalidDate { line: u64, value: String },
    #[error("Invalid amount on line {line}: '{value}'")]
    InvalidAmount { line: u64, value: String },
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Could not parse statement: {0}")]
    Parse(#[from] ParseError),
    #[error("Missing required column(s): {}", .0.join(", "))]
    Schema(Vec<String>),
    #[error("No valid transactions found after processing")]
    EmptyResult,
    #[error("Corrupted data: row {row} has no {field}")]
    Integrity { row: usize, field: &'static str },
    #[error("Transaction dated in the future: {0}")]
    FutureDate(NaiveDate),
}

impl From<csv::Error> for ImportError {
    fn from(e: csv::Error) -> Self {
        ImportError::Parse(ParseError::Csv(e))
    }
}

impl From<std::io::Error> for ImportError {
    fn from(e: std::io::Error) -> Self {
        ImportError::Parse(ParseError::Io(e))
    }
}
