use crate::error::{Result, StoreError};
use chrono::{DateTime, Utc};
use rollcall_core::normalize::phone::PhoneValidationRule;
use rollcall_core::table::{Cell, Highlight, Table};
use rusqlite::{params, Connection, OptionalExtension};

const KIND_TEXT: &str = "text";
const KIND_NUMBER: &str = "number";
const KIND_DATE: &str = "date";

/// A persisted conditional-format rule, one row per column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredValidationRule {
    pub column: String,
    pub valid_pattern: String,
    pub background: String,
}

pub struct SheetsRepo<'a> {
    conn: &'a Connection,
}

impl<'a> SheetsRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Replaces a sheet wholesale: header, cells, highlights and validation
    /// rules all reset to match the given table.
    pub fn replace_table(&self, now_utc: i64, name: &str, table: &Table) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO sheets (name, row_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(name) DO UPDATE SET row_count = ?2, updated_at = ?3;",
            params![name, table.row_count() as i64, now_utc],
        )?;
        tx.execute("DELETE FROM sheet_columns WHERE sheet = ?1;", [name])?;
        tx.execute("DELETE FROM sheet_cells WHERE sheet = ?1;", [name])?;
        tx.execute("DELETE FROM cell_highlights WHERE sheet = ?1;", [name])?;
        tx.execute("DELETE FROM validation_rules WHERE sheet = ?1;", [name])?;

        for (position, column) in table.header().iter().enumerate() {
            tx.execute(
                "INSERT INTO sheet_columns (sheet, position, name) VALUES (?1, ?2, ?3);",
                params![name, position as i64, column],
            )?;
        }

        for (row_idx, row) in table.rows().iter().enumerate() {
            for (col_idx, cell) in row.iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                let (kind, value) = encode_cell(cell);
                tx.execute(
                    "INSERT INTO sheet_cells (sheet, row_idx, col_idx, kind, value)
                     VALUES (?1, ?2, ?3, ?4, ?5);",
                    params![name, row_idx as i64, col_idx as i64, kind, value],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    pub fn read_table(&self, name: &str) -> Result<Table> {
        let row_count: i64 = self
            .conn
            .query_row(
                "SELECT row_count FROM sheets WHERE name = ?1;",
                [name],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("sheet {name}")))?;

        let mut stmt = self.conn.prepare(
            "SELECT name FROM sheet_columns WHERE sheet = ?1 ORDER BY position;",
        )?;
        let header: Vec<String> = stmt
            .query_map([name], |row| row.get(0))?
            .collect::<std::result::Result<_, _>>()?;
        let width = header.len();

        let mut grid = vec![vec![Cell::Empty; width]; row_count as usize];
        let mut stmt = self.conn.prepare(
            "SELECT row_idx, col_idx, kind, value FROM sheet_cells WHERE sheet = ?1;",
        )?;
        let mut rows = stmt.query([name])?;
        while let Some(row) = rows.next()? {
            let row_idx: i64 = row.get(0)?;
            let col_idx: i64 = row.get(1)?;
            let kind: String = row.get(2)?;
            let value: String = row.get(3)?;
            let cell = decode_cell(name, row_idx, col_idx, &kind, &value)?;
            if let Some(slot) = grid
                .get_mut(row_idx as usize)
                .and_then(|cells| cells.get_mut(col_idx as usize))
            {
                *slot = cell;
            }
        }

        let mut table = Table::new(header);
        for cells in grid {
            table.push_row(cells);
        }
        Ok(table)
    }

    /// Writes a full column of values, appending the column to the header if
    /// it does not exist yet. The sheet's row count grows to fit.
    pub fn write_column(
        &self,
        now_utc: i64,
        sheet: &str,
        column: &str,
        values: &[Cell],
    ) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let row_count = sheet_row_count(&tx, sheet)?;
        let col_idx = match column_index(&tx, sheet, column)? {
            Some(index) => index,
            None => {
                let next: i64 = tx.query_row(
                    "SELECT COUNT(*) FROM sheet_columns WHERE sheet = ?1;",
                    [sheet],
                    |row| row.get(0),
                )?;
                tx.execute(
                    "INSERT INTO sheet_columns (sheet, position, name) VALUES (?1, ?2, ?3);",
                    params![sheet, next, column],
                )?;
                next
            }
        };

        tx.execute(
            "DELETE FROM sheet_cells WHERE sheet = ?1 AND col_idx = ?2;",
            params![sheet, col_idx],
        )?;
        for (row_idx, cell) in values.iter().enumerate() {
            if cell.is_empty() {
                continue;
            }
            let (kind, value) = encode_cell(cell);
            tx.execute(
                "INSERT INTO sheet_cells (sheet, row_idx, col_idx, kind, value)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![sheet, row_idx as i64, col_idx, kind, value],
            )?;
        }

        let new_count = row_count.max(values.len() as i64);
        tx.execute(
            "UPDATE sheets SET row_count = ?2, updated_at = ?3 WHERE name = ?1;",
            params![sheet, new_count, now_utc],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn write_cell(
        &self,
        now_utc: i64,
        sheet: &str,
        row: usize,
        column: &str,
        value: &Cell,
    ) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let row_count = sheet_row_count(&tx, sheet)?;
        let col_idx = column_index(&tx, sheet, column)?.ok_or_else(|| {
            StoreError::MissingColumn {
                sheet: sheet.to_string(),
                column: column.to_string(),
            }
        })?;
        if (row as i64) >= row_count {
            return Err(StoreError::NotFound(format!(
                "row {row} in sheet {sheet} (rows: {row_count})"
            )));
        }

        if value.is_empty() {
            tx.execute(
                "DELETE FROM sheet_cells WHERE sheet = ?1 AND row_idx = ?2 AND col_idx = ?3;",
                params![sheet, row as i64, col_idx],
            )?;
        } else {
            let (kind, encoded) = encode_cell(value);
            tx.execute(
                "INSERT OR REPLACE INTO sheet_cells (sheet, row_idx, col_idx, kind, value)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![sheet, row as i64, col_idx, kind, encoded],
            )?;
        }

        tx.execute(
            "UPDATE sheets SET updated_at = ?2 WHERE name = ?1;",
            params![sheet, now_utc],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn clear_highlights(&self, sheet: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM cell_highlights WHERE sheet = ?1;", [sheet])?;
        Ok(())
    }

    pub fn apply_highlights(&self, sheet: &str, highlights: &[Highlight]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        if !sheet_exists(&tx, sheet)? {
            return Err(StoreError::NotFound(format!("sheet {sheet}")));
        }
        for highlight in highlights {
            let col_idx = match &highlight.column {
                Some(column) => Some(column_index(&tx, sheet, column)?.ok_or_else(|| {
                    StoreError::MissingColumn {
                        sheet: sheet.to_string(),
                        column: column.clone(),
                    }
                })?),
                None => None,
            };
            tx.execute(
                "INSERT INTO cell_highlights (sheet, row_idx, col_idx, background, foreground)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    sheet,
                    highlight.row as i64,
                    col_idx,
                    highlight.background,
                    highlight.foreground
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn list_highlights(&self, sheet: &str) -> Result<Vec<Highlight>> {
        let mut stmt = self.conn.prepare(
            "SELECT h.row_idx, c.name, h.background, h.foreground
             FROM cell_highlights h
             LEFT JOIN sheet_columns c ON c.sheet = h.sheet AND c.position = h.col_idx
             WHERE h.sheet = ?1
             ORDER BY h.rowid;",
        )?;
        let mut highlights = Vec::new();
        let mut rows = stmt.query([sheet])?;
        while let Some(row) = rows.next()? {
            let row_idx: i64 = row.get(0)?;
            let column: Option<String> = row.get(1)?;
            highlights.push(Highlight {
                row: row_idx as usize,
                column,
                background: row.get(2)?,
                foreground: row.get(3)?,
            });
        }
        Ok(highlights)
    }

    /// Persists a conditional phone-validity rule for the renderer, one row
    /// per covered column.
    pub fn set_validation_rule(&self, sheet: &str, rule: &PhoneValidationRule) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        if !sheet_exists(&tx, sheet)? {
            return Err(StoreError::NotFound(format!("sheet {sheet}")));
        }
        for column in &rule.columns {
            tx.execute(
                "INSERT OR REPLACE INTO validation_rules (sheet, column_name, valid_pattern, background)
                 VALUES (?1, ?2, ?3, ?4);",
                params![sheet, column, rule.valid_pattern, rule.background],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn validation_rules(&self, sheet: &str) -> Result<Vec<StoredValidationRule>> {
        let mut stmt = self.conn.prepare(
            "SELECT column_name, valid_pattern, background
             FROM validation_rules WHERE sheet = ?1 ORDER BY column_name;",
        )?;
        let rules = stmt
            .query_map([sheet], |row| {
                Ok(StoredValidationRule {
                    column: row.get(0)?,
                    valid_pattern: row.get(1)?,
                    background: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<_, _>>()?;
        Ok(rules)
    }
}

fn sheet_exists(conn: &Connection, sheet: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM sheets WHERE name = ?1;", [sheet], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(found.is_some())
}

fn sheet_row_count(conn: &Connection, sheet: &str) -> Result<i64> {
    conn.query_row(
        "SELECT row_count FROM sheets WHERE name = ?1;",
        [sheet],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(format!("sheet {sheet}")))
}

fn column_index(conn: &Connection, sheet: &str, column: &str) -> Result<Option<i64>> {
    let index: Option<i64> = conn
        .query_row(
            "SELECT position FROM sheet_columns WHERE sheet = ?1 AND name = ?2;",
            params![sheet, column],
            |row| row.get(0),
        )
        .optional()?;
    Ok(index)
}

fn encode_cell(cell: &Cell) -> (&'static str, String) {
    match cell {
        Cell::Empty => (KIND_TEXT, String::new()),
        Cell::Text(value) => (KIND_TEXT, value.clone()),
        Cell::Number(value) => (KIND_NUMBER, value.to_string()),
        Cell::Date(value) => (KIND_DATE, value.to_rfc3339()),
    }
}

fn decode_cell(sheet: &str, row: i64, column: i64, kind: &str, value: &str) -> Result<Cell> {
    let corrupt = |message: String| StoreError::CorruptCell {
        sheet: sheet.to_string(),
        row,
        column,
        message,
    };
    match kind {
        KIND_TEXT => Ok(Cell::text(value)),
        KIND_NUMBER => value
            .parse::<f64>()
            .map(Cell::Number)
            .map_err(|err| corrupt(format!("bad number {value:?}: {err}"))),
        KIND_DATE => DateTime::parse_from_rfc3339(value)
            .map(|instant| Cell::Date(instant.with_timezone(&Utc)))
            .map_err(|err| corrupt(format!("bad date {value:?}: {err}"))),
        other => Err(corrupt(format!("unknown cell kind {other:?}"))),
    }
}
