use anyhow::Error;
use rollcall_config::ConfigError;
use rollcall_core::table::TableStoreError;
use rollcall_core::CoreError;
use rollcall_import::ImportError;
use rollcall_store::error::{StoreError, StoreErrorKind};
use std::process::ExitCode;
use thiserror::Error as ThisError;

pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_NOT_FOUND: u8 = 2;
pub const EXIT_INVALID_INPUT: u8 = 3;

#[derive(Debug, ThisError)]
pub enum CliError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found: {0}")]
    NotFound(String),
}

pub fn invalid_input(message: impl Into<String>) -> Error {
    CliError::InvalidInput(message.into()).into()
}

pub fn report_error(err: &Error, verbose: bool) {
    if verbose {
        eprintln!("error: {:#}", err);
    } else {
        eprintln!("error: {}", err);
    }
}

pub fn exit_code_for(err: &Error) -> ExitCode {
    for cause in err.chain() {
        if let Some(cli_err) = cause.downcast_ref::<CliError>() {
            return ExitCode::from(match cli_err {
                CliError::InvalidInput(_) => EXIT_INVALID_INPUT,
                CliError::NotFound(_) => EXIT_NOT_FOUND,
            });
        }
        if let Some(store_err) = cause.downcast_ref::<StoreError>() {
            return ExitCode::from(store_exit_code(store_err));
        }
        if let Some(config_err) = cause.downcast_ref::<ConfigError>() {
            return ExitCode::from(config_exit_code(config_err));
        }
        if let Some(import_err) = cause.downcast_ref::<ImportError>() {
            return ExitCode::from(match import_err {
                ImportError::Parse(_) => EXIT_INVALID_INPUT,
                ImportError::Io(_) => EXIT_FAILURE,
            });
        }
        if let Some(table_err) = cause.downcast_ref::<TableStoreError>() {
            return ExitCode::from(match table_err {
                TableStoreError::MissingSheet(_) | TableStoreError::MissingColumn { .. } => {
                    EXIT_NOT_FOUND
                }
                TableStoreError::Backend(_) => EXIT_FAILURE,
            });
        }
        if let Some(_core_err) = cause.downcast_ref::<CoreError>() {
            return ExitCode::from(EXIT_INVALID_INPUT);
        }
    }
    ExitCode::from(EXIT_FAILURE)
}

fn store_exit_code(err: &StoreError) -> u8 {
    match err.kind() {
        StoreErrorKind::NotFound | StoreErrorKind::MissingColumn => EXIT_NOT_FOUND,
        StoreErrorKind::InvalidStatus
        | StoreErrorKind::NotOpen
        | StoreErrorKind::InvalidBackupPath => EXIT_INVALID_INPUT,
        StoreErrorKind::MissingHomeDir
        | StoreErrorKind::Migration
        | StoreErrorKind::CorruptCell
        | StoreErrorKind::InvalidDataPath
        | StoreErrorKind::Sql
        | StoreErrorKind::Io => EXIT_FAILURE,
    }
}

fn config_exit_code(err: &ConfigError) -> u8 {
    match err {
        ConfigError::MissingHomeDir => EXIT_FAILURE,
        ConfigError::InvalidConfigPath(_)
        | ConfigError::MissingConfigFile(_)
        | ConfigError::InvalidDateFormat(_)
        | ConfigError::InvalidUtcOffset(_)
        | ConfigError::InvalidChunkSize(_)
        | ConfigError::EmptyColumnName(_)
        | ConfigError::EmptySheetName(_)
        | ConfigError::EmptyListEntry(_)
        | ConfigError::Read { .. }
        | ConfigError::Parse { .. } => EXIT_INVALID_INPUT,
    }
}
