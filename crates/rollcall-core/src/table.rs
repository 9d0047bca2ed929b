use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// A tagged scalar cell value. Spreadsheet-shaped inputs mix strings, numbers
/// and dates within one column, so every consumer branches on the tag
/// explicitly instead of guessing from the text.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(DateTime<Utc>),
}

impl Cell {
    /// Builds a text cell, collapsing empty strings to `Cell::Empty`.
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value)
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(value) => value.is_empty(),
            _ => false,
        }
    }

    /// Display text for the cell. Whole numbers render without a fractional
    /// part so numeric identifiers and phone digits round-trip cleanly.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(value) => value.clone(),
            Cell::Number(value) => format_number(*value),
            Cell::Date(value) => value.to_rfc3339(),
        }
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 9e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// An ordered table of named columns. Rows are padded to the header width at
/// insertion, and the header-to-index map is built once at construction so
/// by-name access stays cheap for the whole invocation.
#[derive(Debug, Clone)]
pub struct Table {
    header: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(header: Vec<String>) -> Self {
        let index = header
            .iter()
            .enumerate()
            .map(|(position, name)| (name.clone(), position))
            .collect();
        Self {
            header,
            index,
            rows: Vec::new(),
        }
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Appends a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut cells: Vec<Cell>) {
        cells.resize(self.header.len(), Cell::Empty);
        self.rows.push(cells);
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Cell> {
        let index = *self.index.get(column)?;
        self.rows.get(row).and_then(|cells| cells.get(index))
    }

    /// Replaces a cell by row index and column name. Returns false when the
    /// column or row does not exist.
    pub fn set_value(&mut self, row: usize, column: &str, value: Cell) -> bool {
        let Some(&index) = self.index.get(column) else {
            return false;
        };
        let Some(cells) = self.rows.get_mut(row) else {
            return false;
        };
        cells[index] = value;
        true
    }

    pub fn column_values(&self, column: &str) -> Option<Vec<Cell>> {
        let index = *self.index.get(column)?;
        Some(self.rows.iter().map(|cells| cells[index].clone()).collect())
    }
}

/// One cell- or row-level color instruction for the rendering store.
/// `column: None` colors the whole row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Highlight {
    pub row: usize,
    pub column: Option<String>,
    pub background: String,
    pub foreground: String,
}

#[derive(Debug, Error)]
pub enum TableStoreError {
    #[error("missing sheet: {0}")]
    MissingSheet(String),
    #[error("missing column {column} in sheet {sheet}")]
    MissingColumn { sheet: String, column: String },
    #[error("store backend error: {0}")]
    Backend(String),
}

/// The tabular-store capability the engine depends on. The reconciliation
/// core reads one snapshot, computes all outputs, and writes back through
/// this seam; it never touches a concrete store.
pub trait TableStore {
    fn read_table(&self, sheet: &str) -> Result<Table, TableStoreError>;
    fn write_column(
        &self,
        sheet: &str,
        column: &str,
        values: &[Cell],
    ) -> Result<(), TableStoreError>;
    fn write_cell(
        &self,
        sheet: &str,
        row: usize,
        column: &str,
        value: &Cell,
    ) -> Result<(), TableStoreError>;
    fn apply_highlights(&self, sheet: &str, highlights: &[Highlight]) -> Result<(), TableStoreError>;
}
