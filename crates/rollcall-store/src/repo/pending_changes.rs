use crate::error::{Result, StoreError};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingStatus {
    Open,
    Applied,
    Dismissed,
    Failed,
}

impl PendingStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            PendingStatus::Open => "open",
            PendingStatus::Applied => "applied",
            PendingStatus::Dismissed => "dismissed",
            PendingStatus::Failed => "failed",
        }
    }
}

impl FromStr for PendingStatus {
    type Err = StoreError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "open" => Ok(PendingStatus::Open),
            "applied" => Ok(PendingStatus::Applied),
            "dismissed" => Ok(PendingStatus::Dismissed),
            "failed" => Ok(PendingStatus::Failed),
            _ => Err(StoreError::InvalidStatus(value.to_string())),
        }
    }
}

/// A queued identifier change awaiting explicit approval.
#[derive(Debug, Clone)]
pub struct PendingChange {
    pub id: i64,
    pub created_at: i64,
    pub status: PendingStatus,
    pub sheet: String,
    pub target_row: i64,
    pub old_id: String,
    pub new_id: String,
    pub display_name: String,
    pub resolved_at: Option<i64>,
    pub failure: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PendingChangeNew {
    pub sheet: String,
    pub target_row: i64,
    pub old_id: String,
    pub new_id: String,
    pub display_name: String,
}

pub struct PendingChangeCreateResult {
    pub change: PendingChange,
    pub created: bool,
}

pub struct PendingChangesRepo<'a> {
    conn: &'a Connection,
}

impl<'a> PendingChangesRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Queues a change unless an identical open one already exists, so
    /// re-running reconciliation does not pile up duplicates.
    pub fn queue(&self, now_utc: i64, input: PendingChangeNew) -> Result<PendingChangeCreateResult> {
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM pending_id_changes
                 WHERE status = ?1 AND sheet = ?2 AND target_row = ?3 AND new_id = ?4
                 LIMIT 1;",
                params![
                    PendingStatus::Open.as_str(),
                    input.sheet,
                    input.target_row,
                    input.new_id
                ],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            let change = self
                .get(id)?
                .ok_or_else(|| StoreError::NotFound(format!("pending change {id}")))?;
            return Ok(PendingChangeCreateResult {
                change,
                created: false,
            });
        }

        self.conn.execute(
            "INSERT INTO pending_id_changes
             (created_at, status, sheet, target_row, old_id, new_id, display_name)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                now_utc,
                PendingStatus::Open.as_str(),
                input.sheet,
                input.target_row,
                input.old_id,
                input.new_id,
                input.display_name
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        let change = self
            .get(id)?
            .ok_or_else(|| StoreError::NotFound(format!("pending change {id}")))?;
        Ok(PendingChangeCreateResult {
            change,
            created: true,
        })
    }

    pub fn list(&self, status: Option<PendingStatus>) -> Result<Vec<PendingChange>> {
        let mut changes = Vec::new();
        match status {
            Some(status) => {
                let mut stmt = self.conn.prepare(
                    "SELECT id, created_at, status, sheet, target_row, old_id, new_id,
                            display_name, resolved_at, failure
                     FROM pending_id_changes WHERE status = ?1 ORDER BY id;",
                )?;
                let mut rows = stmt.query([status.as_str()])?;
                while let Some(row) = rows.next()? {
                    changes.push(pending_change_from_row(row)?);
                }
            }
            None => {
                let mut stmt = self.conn.prepare(
                    "SELECT id, created_at, status, sheet, target_row, old_id, new_id,
                            display_name, resolved_at, failure
                     FROM pending_id_changes ORDER BY id;",
                )?;
                let mut rows = stmt.query([])?;
                while let Some(row) = rows.next()? {
                    changes.push(pending_change_from_row(row)?);
                }
            }
        }
        Ok(changes)
    }

    pub fn list_open(&self) -> Result<Vec<PendingChange>> {
        self.list(Some(PendingStatus::Open))
    }

    pub fn get(&self, id: i64) -> Result<Option<PendingChange>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, created_at, status, sheet, target_row, old_id, new_id,
                    display_name, resolved_at, failure
             FROM pending_id_changes WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(pending_change_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn mark_applied(&self, now_utc: i64, id: i64) -> Result<()> {
        self.resolve_open(now_utc, id, PendingStatus::Applied, None)
    }

    pub fn mark_failed(&self, now_utc: i64, id: i64, message: &str) -> Result<()> {
        self.resolve_open(now_utc, id, PendingStatus::Failed, Some(message))
    }

    pub fn dismiss(&self, now_utc: i64, id: i64) -> Result<()> {
        self.resolve_open(now_utc, id, PendingStatus::Dismissed, None)
    }

    fn resolve_open(
        &self,
        now_utc: i64,
        id: i64,
        status: PendingStatus,
        failure: Option<&str>,
    ) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE pending_id_changes
             SET status = ?2, resolved_at = ?3, failure = ?4
             WHERE id = ?1 AND status = ?5;",
            params![
                id,
                status.as_str(),
                now_utc,
                failure,
                PendingStatus::Open.as_str()
            ],
        )?;
        if updated != 1 {
            if self.get(id)?.is_none() {
                return Err(StoreError::NotFound(format!("pending change {id}")));
            }
            return Err(StoreError::NotOpen(id));
        }
        Ok(())
    }
}

fn pending_change_from_row(row: &Row<'_>) -> Result<PendingChange> {
    let status: String = row.get(2)?;
    Ok(PendingChange {
        id: row.get(0)?,
        created_at: row.get(1)?,
        status: status.parse()?,
        sheet: row.get(3)?,
        target_row: row.get(4)?,
        old_id: row.get(5)?,
        new_id: row.get(6)?,
        display_name: row.get(7)?,
        resolved_at: row.get(8)?,
        failure: row.get(9)?,
    })
}
