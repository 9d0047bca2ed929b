pub mod backup;
pub mod db;
pub mod error;
pub mod migrate;
pub mod paths;
pub mod repo;

use crate::error::{Result, StoreError};
use chrono::Utc;
use rollcall_core::table::{Cell, Highlight, Table, TableStore, TableStoreError};
use rusqlite::Connection;
use std::path::Path;

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = db::open(path)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = db::open_in_memory()?;
        Ok(Self { conn })
    }

    pub fn migrate(&self) -> Result<()> {
        migrate::run_migrations(&self.conn)
    }

    pub fn schema_version(&self) -> Result<i64> {
        migrate::schema_version(&self.conn)
    }

    pub fn backup_to(&self, path: &Path) -> Result<()> {
        backup::backup_to(&self.conn, path)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn sheets(&self) -> repo::SheetsRepo<'_> {
        repo::SheetsRepo::new(&self.conn)
    }

    pub fn pending_changes(&self) -> repo::PendingChangesRepo<'_> {
        repo::PendingChangesRepo::new(&self.conn)
    }
}

// The reconciliation core sees the store only through this seam.
impl TableStore for Store {
    fn read_table(&self, sheet: &str) -> std::result::Result<Table, TableStoreError> {
        self.sheets().read_table(sheet).map_err(into_table_error)
    }

    fn write_column(
        &self,
        sheet: &str,
        column: &str,
        values: &[Cell],
    ) -> std::result::Result<(), TableStoreError> {
        self.sheets()
            .write_column(Utc::now().timestamp(), sheet, column, values)
            .map_err(into_table_error)
    }

    fn write_cell(
        &self,
        sheet: &str,
        row: usize,
        column: &str,
        value: &Cell,
    ) -> std::result::Result<(), TableStoreError> {
        self.sheets()
            .write_cell(Utc::now().timestamp(), sheet, row, column, value)
            .map_err(into_table_error)
    }

    fn apply_highlights(
        &self,
        sheet: &str,
        highlights: &[Highlight],
    ) -> std::result::Result<(), TableStoreError> {
        self.sheets()
            .apply_highlights(sheet, highlights)
            .map_err(into_table_error)
    }
}

fn into_table_error(err: StoreError) -> TableStoreError {
    match &err {
        StoreError::NotFound(message) => TableStoreError::MissingSheet(message.clone()),
        StoreError::MissingColumn { sheet, column } => TableStoreError::MissingColumn {
            sheet: sheet.clone(),
            column: column.clone(),
        },
        _ => TableStoreError::Backend(err.to_string()),
    }
}
