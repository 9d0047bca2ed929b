use crate::normalize::date::DateFormat;
use crate::normalize::text::collapse_whitespace;
use crate::reconcile::identity::KeyColumns;
use crate::reconcile::matcher::{MatchKind, MatchOutcome};
use crate::table::{Cell, Table};
use chrono::FixedOffset;
use serde::Serialize;

pub const ACTION_NEW_MEMBER: &str = "New Member";
pub const ACTION_ID_CHANGED: &str = "Member ID Changed";
pub const ACTION_FIELD_UPDATES: &str = "Field Updates";
pub const ACTION_DELIMITER: &str = ", ";

/// A queued identifier change. Never applied here; the applier writes it
/// back only after explicit approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentifierChange {
    pub old_id: String,
    pub new_id: String,
    pub display_name: String,
    pub roster_row: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeAnnotation {
    pub actions: Vec<String>,
    pub changed_columns: Vec<String>,
    pub identifier_change: Option<IdentifierChange>,
}

impl ChangeAnnotation {
    /// Display label for the Action column, labels in encounter order.
    pub fn action_label(&self) -> String {
        self.actions.join(ACTION_DELIMITER)
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Shared inputs for one diff pass; the detector never mutates any of them.
#[derive(Debug, Clone, Copy)]
pub struct DiffContext<'a> {
    pub roster: &'a Table,
    pub incoming: &'a Table,
    pub columns: &'a KeyColumns,
    pub tracked: &'a [String],
    pub format: DateFormat,
    pub offset: FixedOffset,
}

pub fn annotate_row(
    ctx: &DiffContext<'_>,
    incoming_row: usize,
    outcome: MatchOutcome,
) -> ChangeAnnotation {
    let mut annotation = ChangeAnnotation::default();

    let Some(roster_row) = outcome.roster_row else {
        annotation.actions.push(ACTION_NEW_MEMBER.to_string());
        return annotation;
    };

    let existing_id = trimmed_text(ctx.roster, roster_row, &ctx.columns.identifier);
    let incoming_id = trimmed_text(ctx.incoming, incoming_row, &ctx.columns.identifier);
    // Only a name/DOB match can reveal an identifier change; an exact ID
    // match is taken at face value.
    if existing_id != incoming_id && outcome.kind == MatchKind::NameDob {
        annotation.identifier_change = Some(IdentifierChange {
            old_id: existing_id,
            new_id: incoming_id,
            display_name: display_name(ctx.incoming, incoming_row, ctx.columns),
            roster_row,
        });
        annotation.actions.push(ACTION_ID_CHANGED.to_string());
    }

    for column in ctx.tracked {
        if !ctx.roster.has_column(column) || !ctx.incoming.has_column(column) {
            continue;
        }
        let differ = match (
            ctx.roster.value(roster_row, column),
            ctx.incoming.value(incoming_row, column),
        ) {
            (Some(existing), Some(incoming)) => values_differ(existing, incoming),
            (Some(only), None) | (None, Some(only)) => !only.is_empty(),
            (None, None) => false,
        };
        if differ {
            annotation.changed_columns.push(column.clone());
        }
    }
    if !annotation.changed_columns.is_empty() {
        annotation.actions.push(ACTION_FIELD_UPDATES.to_string());
    }

    annotation
}

/// Date-typed cells compare by underlying instant; everything else by
/// trimmed, case-folded display text.
fn values_differ(a: &Cell, b: &Cell) -> bool {
    match (a, b) {
        (Cell::Date(left), Cell::Date(right)) => left != right,
        _ => {
            let left = a.as_text();
            let right = b.as_text();
            left.trim().to_lowercase() != right.trim().to_lowercase()
        }
    }
}

fn display_name(table: &Table, row: usize, columns: &KeyColumns) -> String {
    let first = trimmed_text(table, row, &columns.first_name);
    let last = trimmed_text(table, row, &columns.last_name);
    collapse_whitespace(&format!("{first} {last}"))
}

fn trimmed_text(table: &Table, row: usize, column: &str) -> String {
    table
        .value(row, column)
        .map(|cell| cell.as_text().trim().to_string())
        .unwrap_or_default()
}
