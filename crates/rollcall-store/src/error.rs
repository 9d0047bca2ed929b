use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite error: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("missing home directory")]
    MissingHomeDir,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("missing column {column} in sheet {sheet}")]
    MissingColumn { sheet: String, column: String },
    #[error("corrupt cell at {sheet}[{row}][{column}]: {message}")]
    CorruptCell {
        sheet: String,
        row: i64,
        column: i64,
        message: String,
    },
    #[error("unknown pending change status: {0}")]
    InvalidStatus(String),
    #[error("pending change {0} is not open")]
    NotOpen(i64),
    #[error("migration error: {0}")]
    Migration(String),
    #[error("invalid data path: {0}")]
    InvalidDataPath(PathBuf),
    #[error("invalid backup path (matches database): {0}")]
    InvalidBackupPath(PathBuf),
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    Io,
    Sql,
    MissingHomeDir,
    NotFound,
    MissingColumn,
    CorruptCell,
    InvalidStatus,
    NotOpen,
    Migration,
    InvalidDataPath,
    InvalidBackupPath,
}

impl StoreError {
    pub fn kind(&self) -> StoreErrorKind {
        match self {
            StoreError::Io(_) => StoreErrorKind::Io,
            StoreError::Sql(_) => StoreErrorKind::Sql,
            StoreError::MissingHomeDir => StoreErrorKind::MissingHomeDir,
            StoreError::NotFound(_) => StoreErrorKind::NotFound,
            StoreError::MissingColumn { .. } => StoreErrorKind::MissingColumn,
            StoreError::CorruptCell { .. } => StoreErrorKind::CorruptCell,
            StoreError::InvalidStatus(_) => StoreErrorKind::InvalidStatus,
            StoreError::NotOpen(_) => StoreErrorKind::NotOpen,
            StoreError::Migration(_) => StoreErrorKind::Migration,
            StoreError::InvalidDataPath(_) => StoreErrorKind::InvalidDataPath,
            StoreError::InvalidBackupPath(_) => StoreErrorKind::InvalidBackupPath,
        }
    }
}
