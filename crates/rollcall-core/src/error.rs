use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("missing column {column} in {table} table")]
    MissingColumn { table: String, column: String },
    #[error("invalid utc offset: {0}")]
    InvalidUtcOffset(String),
    #[error("invalid date format: {0}")]
    InvalidDateFormat(String),
    #[error("chunk size must be at least 1")]
    InvalidChunkSize,
}
