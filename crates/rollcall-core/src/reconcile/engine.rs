use crate::error::CoreError;
use crate::normalize::date::DateFormat;
use crate::reconcile::diff::{annotate_row, ChangeAnnotation, DiffContext, IdentifierChange};
use crate::reconcile::identity::{identity_key, KeyColumns};
use crate::reconcile::matcher::{MatchKind, RosterIndex};
use crate::table::{Cell, Highlight, Table};
use chrono::FixedOffset;
use serde::Serialize;
use std::thread;
use std::time::Duration;

pub const NEW_MEMBER_BACKGROUND: &str = "#d9ead3";
pub const CHANGED_FIELD_BACKGROUND: &str = "#fff2cc";
pub const CHANGED_ID_BACKGROUND: &str = "#f4cccc";
pub const HIGHLIGHT_FOREGROUND: &str = "#000000";

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub key_columns: KeyColumns,
    pub tracked_columns: Vec<String>,
    pub date_format: DateFormat,
    pub utc_offset: FixedOffset,
    pub chunk_size: usize,
    pub chunk_pause: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileCounts {
    pub incoming_rows: usize,
    pub new_members: usize,
    pub identifier_changes: usize,
    pub updated_rows: usize,
    pub unchanged_rows: usize,
}

/// Everything one reconciliation pass produces. Derived, read-only values;
/// the caller performs the single batch write-back.
#[derive(Debug)]
pub struct ReconcileOutput {
    pub actions: Vec<Cell>,
    pub annotations: Vec<ChangeAnnotation>,
    pub highlights: Vec<Highlight>,
    pub pending_changes: Vec<IdentifierChange>,
    pub counts: ReconcileCounts,
}

/// Matches every incoming row against the roster snapshot and annotates the
/// drift. Fails before producing any output when a key column is missing
/// from either table; chunking only paces the work and never changes it.
pub fn reconcile(
    roster: &Table,
    incoming: &Table,
    options: &ReconcileOptions,
) -> Result<ReconcileOutput, CoreError> {
    if options.chunk_size == 0 {
        return Err(CoreError::InvalidChunkSize);
    }
    require_key_columns(roster, "roster", &options.key_columns)?;
    require_key_columns(incoming, "incoming", &options.key_columns)?;

    let index = RosterIndex::build(
        roster,
        &options.key_columns,
        options.date_format,
        options.utc_offset,
    );
    let ctx = DiffContext {
        roster,
        incoming,
        columns: &options.key_columns,
        tracked: &options.tracked_columns,
        format: options.date_format,
        offset: options.utc_offset,
    };

    let total = incoming.row_count();
    let mut output = ReconcileOutput {
        actions: Vec::with_capacity(total),
        annotations: Vec::with_capacity(total),
        highlights: Vec::new(),
        pending_changes: Vec::new(),
        counts: ReconcileCounts {
            incoming_rows: total,
            ..ReconcileCounts::default()
        },
    };

    let mut row = 0;
    while row < total {
        let end = (row + options.chunk_size).min(total);
        for current in row..end {
            process_row(&ctx, &index, current, options, &mut output);
        }
        row = end;
        // Cooperative pause to respect host execution-time limits; chunk
        // boundaries have no semantic effect.
        if row < total && !options.chunk_pause.is_zero() {
            thread::sleep(options.chunk_pause);
        }
    }

    Ok(output)
}

fn process_row(
    ctx: &DiffContext<'_>,
    index: &RosterIndex,
    row: usize,
    options: &ReconcileOptions,
    output: &mut ReconcileOutput,
) {
    let key = identity_key(
        ctx.incoming,
        row,
        &options.key_columns,
        options.date_format,
        options.utc_offset,
    );
    let outcome = index.resolve(&key);
    let annotation = annotate_row(ctx, row, outcome);

    if outcome.kind == MatchKind::None {
        output.counts.new_members += 1;
        output.highlights.push(Highlight {
            row,
            column: None,
            background: NEW_MEMBER_BACKGROUND.to_string(),
            foreground: HIGHLIGHT_FOREGROUND.to_string(),
        });
    } else if annotation.is_empty() {
        output.counts.unchanged_rows += 1;
    }

    if let Some(change) = annotation.identifier_change.clone() {
        output.counts.identifier_changes += 1;
        output.highlights.push(Highlight {
            row,
            column: Some(options.key_columns.identifier.clone()),
            background: CHANGED_ID_BACKGROUND.to_string(),
            foreground: HIGHLIGHT_FOREGROUND.to_string(),
        });
        output.pending_changes.push(change);
    }

    if !annotation.changed_columns.is_empty() {
        output.counts.updated_rows += 1;
        for column in &annotation.changed_columns {
            output.highlights.push(Highlight {
                row,
                column: Some(column.clone()),
                background: CHANGED_FIELD_BACKGROUND.to_string(),
                foreground: HIGHLIGHT_FOREGROUND.to_string(),
            });
        }
    }

    output.actions.push(Cell::text(annotation.action_label()));
    output.annotations.push(annotation);
}

fn require_key_columns(table: &Table, name: &str, columns: &KeyColumns) -> Result<(), CoreError> {
    for column in [
        &columns.identifier,
        &columns.first_name,
        &columns.last_name,
        &columns.date_of_birth,
    ] {
        if !table.has_column(column) {
            return Err(CoreError::MissingColumn {
                table: name.to_string(),
                column: column.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{reconcile, ReconcileOptions, NEW_MEMBER_BACKGROUND};
    use crate::error::CoreError;
    use crate::normalize::date::DateFormat;
    use crate::reconcile::identity::tests::{key_columns, offset};
    use crate::table::{Cell, Table};
    use std::time::Duration;

    const HEADER: &[&str] = &[
        "Member ID",
        "First Name",
        "Last Name",
        "Date of Birth",
        "Address",
    ];

    fn table_with(columns: &[&str], rows: &[&[&str]]) -> Table {
        let mut table = Table::new(columns.iter().map(|name| name.to_string()).collect());
        for row in rows {
            table.push_row(row.iter().map(|value| Cell::text(*value)).collect());
        }
        table
    }

    fn options(chunk_size: usize) -> ReconcileOptions {
        ReconcileOptions {
            key_columns: key_columns(),
            tracked_columns: vec!["Address".to_string()],
            date_format: DateFormat::Au,
            utc_offset: offset(),
            chunk_size,
            chunk_pause: Duration::ZERO,
        }
    }

    fn sample_tables() -> (Table, Table) {
        let roster = table_with(
            HEADER,
            &[
                &["100", "Alex", "Lee", "1/01/2010", "1 A St"],
                &["200", "Sam", "Ng", "5/05/2012", "2 B St"],
            ],
        );
        let incoming = table_with(
            HEADER,
            &[
                &["101", "Alex", "Lee", "1/01/2010", "1 A St"],
                &["200", "Sam", "Ng", "5/05/2012", "9 Z St"],
                &["", "Kim", "Wu", "7/07/2014", "3 C St"],
            ],
        );
        (roster, incoming)
    }

    #[test]
    fn full_pass_produces_actions_pending_changes_and_counts() {
        let (roster, incoming) = sample_tables();
        let output = reconcile(&roster, &incoming, &options(50)).expect("reconcile");

        assert_eq!(output.counts.incoming_rows, 3);
        assert_eq!(output.counts.identifier_changes, 1);
        assert_eq!(output.counts.updated_rows, 1);
        assert_eq!(output.counts.new_members, 1);
        assert_eq!(output.counts.unchanged_rows, 0);

        assert_eq!(output.actions[0], Cell::text("Member ID Changed"));
        assert_eq!(output.actions[1], Cell::text("Field Updates"));
        assert_eq!(output.actions[2], Cell::text("New Member"));

        assert_eq!(output.pending_changes.len(), 1);
        assert_eq!(output.pending_changes[0].old_id, "100");
        assert_eq!(output.pending_changes[0].new_id, "101");
    }

    #[test]
    fn unchanged_rows_get_empty_action_cells() {
        let roster = table_with(HEADER, &[&["100", "Alex", "Lee", "1/01/2010", "1 A St"]]);
        let incoming = table_with(HEADER, &[&["100", "Alex", "Lee", "1/01/2010", "1 A St"]]);

        let output = reconcile(&roster, &incoming, &options(50)).expect("reconcile");
        assert_eq!(output.actions, vec![Cell::Empty]);
        assert_eq!(output.counts.unchanged_rows, 1);
    }

    #[test]
    fn chunking_is_transparent_to_outputs() {
        let (roster, incoming) = sample_tables();
        let whole = reconcile(&roster, &incoming, &options(100)).expect("reconcile");
        let chunked = reconcile(&roster, &incoming, &options(1)).expect("reconcile");

        assert_eq!(whole.actions, chunked.actions);
        assert_eq!(whole.annotations, chunked.annotations);
        assert_eq!(whole.highlights, chunked.highlights);
        assert_eq!(whole.pending_changes, chunked.pending_changes);
        assert_eq!(whole.counts, chunked.counts);
    }

    #[test]
    fn new_members_get_whole_row_highlights() {
        let (roster, incoming) = sample_tables();
        let output = reconcile(&roster, &incoming, &options(50)).expect("reconcile");

        let row_highlight = output
            .highlights
            .iter()
            .find(|highlight| highlight.column.is_none())
            .expect("whole-row highlight");
        assert_eq!(row_highlight.row, 2);
        assert_eq!(row_highlight.background, NEW_MEMBER_BACKGROUND);
    }

    #[test]
    fn missing_key_column_aborts_before_any_output() {
        let (roster, _) = sample_tables();
        let incoming = table_with(&["First Name"], &[&["Alex"]]);

        let err = reconcile(&roster, &incoming, &options(50)).unwrap_err();
        assert_eq!(
            err,
            CoreError::MissingColumn {
                table: "incoming".to_string(),
                column: "Member ID".to_string(),
            }
        );
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let (roster, incoming) = sample_tables();
        let err = reconcile(&roster, &incoming, &options(0)).unwrap_err();
        assert_eq!(err, CoreError::InvalidChunkSize);
    }
}
