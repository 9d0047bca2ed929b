use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use rollcall_core::normalize::date::{parse_utc_offset, DateFormat};
use rollcall_core::reconcile::dedupe::ContactColumns;
use rollcall_core::reconcile::identity::KeyColumns;
use serde::Deserialize;
use thiserror::Error;

const APP_DIR: &str = "rollcall";
const CONFIG_FILENAME: &str = "config.toml";

pub const DEFAULT_ROSTER_SHEET: &str = "roster";
pub const DEFAULT_IMPORT_SHEET: &str = "import";
pub const DEFAULT_UTC_OFFSET: &str = "+10:00";
pub const DEFAULT_CHUNK_SIZE: usize = 200;
pub const DEFAULT_CHUNK_PAUSE_MS: u64 = 20;

/// Configuration value object built once per invocation and passed down;
/// nothing in the engine reads process-wide state.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub roster_sheet: String,
    pub import_sheet: String,
    pub key_columns: KeyColumns,
    pub contact_columns: ContactColumns,
    pub phone_columns: Vec<String>,
    pub tracked_columns: Vec<String>,
    pub date_format: DateFormat,
    pub utc_offset: FixedOffset,
    pub confirm_identifier_changes: bool,
    pub auto_apply_identifier_changes: bool,
    pub chunk_size: usize,
    pub chunk_pause_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            roster_sheet: DEFAULT_ROSTER_SHEET.to_string(),
            import_sheet: DEFAULT_IMPORT_SHEET.to_string(),
            key_columns: KeyColumns {
                identifier: "Member ID".to_string(),
                first_name: "First Name".to_string(),
                last_name: "Last Name".to_string(),
                date_of_birth: "Date of Birth".to_string(),
            },
            contact_columns: ContactColumns {
                member_mobile: "Member Mobile".to_string(),
                member_email: "Member_Email".to_string(),
                additional_emails: "Additional Email Addresses".to_string(),
                parent1_mobile: "Parent1_Mobile".to_string(),
                parent1_email: "Parent1_Email".to_string(),
                parent2_mobile: "Parent2_Mobile".to_string(),
                parent2_email: "Parent2_Email".to_string(),
            },
            phone_columns: vec![
                "Member Mobile".to_string(),
                "Parent1_Mobile".to_string(),
                "Parent2_Mobile".to_string(),
            ],
            tracked_columns: vec![
                "Medical Info".to_string(),
                "Member Mobile".to_string(),
                "Member_Email".to_string(),
                "Additional Email Addresses".to_string(),
                "Parent1_Mobile".to_string(),
                "Parent1_Email".to_string(),
                "Parent2_Mobile".to_string(),
                "Parent2_Email".to_string(),
                "Address".to_string(),
            ],
            date_format: DateFormat::Au,
            utc_offset: parse_utc_offset(DEFAULT_UTC_OFFSET).expect("default offset"),
            confirm_identifier_changes: true,
            auto_apply_identifier_changes: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_pause_ms: DEFAULT_CHUNK_PAUSE_MS,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing home directory")]
    MissingHomeDir,
    #[error("invalid config path: {0}")]
    InvalidConfigPath(PathBuf),
    #[error("config file not found: {0}")]
    MissingConfigFile(PathBuf),
    #[error("invalid date_format value: {0}")]
    InvalidDateFormat(String),
    #[error("invalid utc_offset value: {0}")]
    InvalidUtcOffset(String),
    #[error("invalid chunk_size value: {0}")]
    InvalidChunkSize(usize),
    #[error("empty column name for {0}")]
    EmptyColumnName(&'static str),
    #[error("empty sheet name for {0}")]
    EmptySheetName(&'static str),
    #[error("empty entry in {0} list")]
    EmptyListEntry(&'static str),
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    roster_sheet: Option<String>,
    import_sheet: Option<String>,
    columns: Option<ColumnsFile>,
    contacts: Option<ContactsFile>,
    phones: Option<PhonesFile>,
    reconcile: Option<ReconcileFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ColumnsFile {
    identifier: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    date_of_birth: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ContactsFile {
    member_mobile: Option<String>,
    member_email: Option<String>,
    additional_emails: Option<String>,
    parent1_mobile: Option<String>,
    parent1_email: Option<String>,
    parent2_mobile: Option<String>,
    parent2_email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PhonesFile {
    columns: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReconcileFile {
    tracked_columns: Option<Vec<String>>,
    date_format: Option<String>,
    utc_offset: Option<String>,
    confirm_identifier_changes: Option<bool>,
    auto_apply_identifier_changes: Option<bool>,
    chunk_size: Option<usize>,
    chunk_pause_ms: Option<u64>,
}

pub fn load(config_path: Option<PathBuf>) -> Result<AppConfig> {
    let required = config_path.is_some();
    let path = match resolve_config_path(config_path) {
        Ok(path) => path,
        Err(ConfigError::MissingHomeDir) if !required => return Ok(AppConfig::default()),
        Err(ConfigError::InvalidConfigPath(_)) if !required => return Ok(AppConfig::default()),
        Err(err) => return Err(err),
    };
    match load_at_path(&path, required)? {
        Some(config) => Ok(config),
        None => Ok(AppConfig::default()),
    }
}

pub fn resolve_config_path(custom: Option<PathBuf>) -> Result<PathBuf> {
    match custom {
        Some(path) => {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::InvalidConfigPath(path));
            }
            Ok(path)
        }
        None => {
            let base = if let Some(dir) = env::var_os("XDG_CONFIG_HOME") {
                let path = PathBuf::from(dir);
                if path.as_os_str().is_empty() {
                    return Err(ConfigError::InvalidConfigPath(path));
                }
                path
            } else {
                let home = dirs::home_dir().ok_or(ConfigError::MissingHomeDir)?;
                home.join(".config")
            };
            Ok(base.join(APP_DIR).join(CONFIG_FILENAME))
        }
    }
}

fn load_at_path(path: &Path, required: bool) -> Result<Option<AppConfig>> {
    if !path.exists() {
        if required {
            return Err(ConfigError::MissingConfigFile(path.to_path_buf()));
        }
        return Ok(None);
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: ConfigFile = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(merge_config(parsed)?))
}

fn merge_config(file: ConfigFile) -> Result<AppConfig> {
    let mut config = AppConfig::default();

    if let Some(value) = file.roster_sheet {
        config.roster_sheet = require_sheet("roster_sheet", value)?;
    }
    if let Some(value) = file.import_sheet {
        config.import_sheet = require_sheet("import_sheet", value)?;
    }

    if let Some(columns) = file.columns {
        merge_column(&mut config.key_columns.identifier, "columns.identifier", columns.identifier)?;
        merge_column(
            &mut config.key_columns.first_name,
            "columns.first_name",
            columns.first_name,
        )?;
        merge_column(
            &mut config.key_columns.last_name,
            "columns.last_name",
            columns.last_name,
        )?;
        merge_column(
            &mut config.key_columns.date_of_birth,
            "columns.date_of_birth",
            columns.date_of_birth,
        )?;
    }

    if let Some(contacts) = file.contacts {
        let fields = &mut config.contact_columns;
        merge_column(&mut fields.member_mobile, "contacts.member_mobile", contacts.member_mobile)?;
        merge_column(&mut fields.member_email, "contacts.member_email", contacts.member_email)?;
        merge_column(
            &mut fields.additional_emails,
            "contacts.additional_emails",
            contacts.additional_emails,
        )?;
        merge_column(
            &mut fields.parent1_mobile,
            "contacts.parent1_mobile",
            contacts.parent1_mobile,
        )?;
        merge_column(
            &mut fields.parent1_email,
            "contacts.parent1_email",
            contacts.parent1_email,
        )?;
        merge_column(
            &mut fields.parent2_mobile,
            "contacts.parent2_mobile",
            contacts.parent2_mobile,
        )?;
        merge_column(
            &mut fields.parent2_email,
            "contacts.parent2_email",
            contacts.parent2_email,
        )?;
    }

    if let Some(phones) = file.phones {
        if let Some(columns) = phones.columns {
            config.phone_columns = require_list("phones.columns", columns)?;
        }
    }

    if let Some(reconcile) = file.reconcile {
        if let Some(columns) = reconcile.tracked_columns {
            config.tracked_columns = require_list("reconcile.tracked_columns", columns)?;
        }
        if let Some(raw) = reconcile.date_format {
            config.date_format =
                DateFormat::parse(&raw).map_err(|_| ConfigError::InvalidDateFormat(raw))?;
        }
        if let Some(raw) = reconcile.utc_offset {
            config.utc_offset =
                parse_utc_offset(&raw).map_err(|_| ConfigError::InvalidUtcOffset(raw))?;
        }
        if let Some(value) = reconcile.confirm_identifier_changes {
            config.confirm_identifier_changes = value;
        }
        if let Some(value) = reconcile.auto_apply_identifier_changes {
            config.auto_apply_identifier_changes = value;
        }
        if let Some(value) = reconcile.chunk_size {
            if value == 0 {
                return Err(ConfigError::InvalidChunkSize(value));
            }
            config.chunk_size = value;
        }
        if let Some(value) = reconcile.chunk_pause_ms {
            config.chunk_pause_ms = value;
        }
    }

    Ok(config)
}

fn merge_column(
    target: &mut String,
    field: &'static str,
    value: Option<String>,
) -> Result<()> {
    if let Some(value) = value {
        if value.trim().is_empty() {
            return Err(ConfigError::EmptyColumnName(field));
        }
        *target = value;
    }
    Ok(())
}

fn require_sheet(field: &'static str, value: String) -> Result<String> {
    if value.trim().is_empty() {
        return Err(ConfigError::EmptySheetName(field));
    }
    Ok(value)
}

fn require_list(field: &'static str, values: Vec<String>) -> Result<Vec<String>> {
    for value in &values {
        if value.trim().is_empty() {
            return Err(ConfigError::EmptyListEntry(field));
        }
    }
    Ok(values)
}
