use crate::commands::{print_json, Context};
use crate::util::now_utc;
use anyhow::{Context as _, Result};
use clap::Args;
use rollcall_core::reconcile::apply::apply_identifier_updates;
use rollcall_core::reconcile::engine::{self, ReconcileCounts, ReconcileOptions};
use rollcall_core::TableStore;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

pub const ACTION_COLUMN: &str = "Action";

#[derive(Debug, Args)]
pub struct ReconcileArgs {
    #[arg(long, help = "Roster sheet (defaults to the configured one)")]
    pub roster: Option<String>,
    #[arg(long, help = "Import sheet (defaults to the configured one)")]
    pub import: Option<String>,
    #[arg(long, help = "Compute and report without writing anything")]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
struct ReconcileReport {
    roster_sheet: String,
    import_sheet: String,
    counts: ReconcileCounts,
    queued_identifier_changes: usize,
    auto_applied: usize,
    auto_apply_failures: Vec<String>,
    dry_run: bool,
}

pub fn reconcile(ctx: &Context<'_>, args: ReconcileArgs) -> Result<()> {
    let roster_sheet = args
        .roster
        .unwrap_or_else(|| ctx.config.roster_sheet.clone());
    let import_sheet = args
        .import
        .unwrap_or_else(|| ctx.config.import_sheet.clone());

    // Missing roster or import sheet is fatal for the whole run; nothing is
    // written in that case.
    let roster = ctx
        .store
        .sheets()
        .read_table(&roster_sheet)
        .with_context(|| format!("read roster sheet {roster_sheet}"))?;
    let incoming = ctx
        .store
        .sheets()
        .read_table(&import_sheet)
        .with_context(|| format!("read import sheet {import_sheet}"))?;

    let options = ReconcileOptions {
        key_columns: ctx.config.key_columns.clone(),
        tracked_columns: ctx.config.tracked_columns.clone(),
        date_format: ctx.config.date_format,
        utc_offset: ctx.config.utc_offset,
        chunk_size: ctx.config.chunk_size,
        chunk_pause: Duration::from_millis(ctx.config.chunk_pause_ms),
    };
    let output = engine::reconcile(&roster, &incoming, &options)?;
    debug!(
        rows = output.counts.incoming_rows,
        new = output.counts.new_members,
        id_changes = output.counts.identifier_changes,
        "reconciliation computed"
    );

    let mut report = ReconcileReport {
        roster_sheet: roster_sheet.clone(),
        import_sheet: import_sheet.clone(),
        counts: output.counts,
        queued_identifier_changes: 0,
        auto_applied: 0,
        auto_apply_failures: Vec::new(),
        dry_run: args.dry_run,
    };

    if !args.dry_run {
        let now = now_utc();
        ctx.store
            .sheets()
            .write_column(now, &import_sheet, ACTION_COLUMN, &output.actions)
            .with_context(|| "write action column")?;
        ctx.store
            .sheets()
            .clear_highlights(&import_sheet)
            .with_context(|| "clear highlights")?;
        ctx.store
            .sheets()
            .apply_highlights(&import_sheet, &output.highlights)
            .with_context(|| "apply highlights")?;

        let mut auto_apply = Vec::new();
        for change in &output.pending_changes {
            let queued = ctx.store.pending_changes().queue(
                now,
                rollcall_store::repo::PendingChangeNew {
                    sheet: roster_sheet.clone(),
                    target_row: change.roster_row as i64,
                    old_id: change.old_id.clone(),
                    new_id: change.new_id.clone(),
                    display_name: change.display_name.clone(),
                },
            )?;
            if !queued.created {
                continue;
            }
            report.queued_identifier_changes += 1;
            if ctx.config.auto_apply_identifier_changes {
                auto_apply.push((queued.change.id, change.clone()));
            }
        }

        if !auto_apply.is_empty() {
            let store: &dyn TableStore = ctx.store;
            let changes = auto_apply.iter().map(|(_, change)| change.clone()).collect();
            let outcomes = apply_identifier_updates(
                store,
                &roster_sheet,
                &ctx.config.key_columns.identifier,
                changes,
            );
            for ((pending_id, _), outcome) in auto_apply.iter().zip(outcomes) {
                match outcome.error {
                    None => {
                        ctx.store.pending_changes().mark_applied(now, *pending_id)?;
                        report.auto_applied += 1;
                    }
                    Some(err) => {
                        let message = err.to_string();
                        ctx.store
                            .pending_changes()
                            .mark_failed(now, *pending_id, &message)?;
                        report.auto_apply_failures.push(format!(
                            "{} ({} -> {}): {message}",
                            outcome.change.display_name,
                            outcome.change.old_id,
                            outcome.change.new_id
                        ));
                    }
                }
            }
        }
    }

    if ctx.json {
        return print_json(&report);
    }

    if report.dry_run {
        println!("Dry-run: nothing written.");
    }
    println!(
        "Reconciled {} incoming row(s): {} new, {} identifier change(s), {} updated, {} unchanged",
        report.counts.incoming_rows,
        report.counts.new_members,
        report.counts.identifier_changes,
        report.counts.updated_rows,
        report.counts.unchanged_rows
    );
    if report.queued_identifier_changes > 0 {
        println!(
            "Queued {} identifier change(s); review with `rollcall ids list`",
            report.queued_identifier_changes
        );
    }
    if report.auto_applied > 0 {
        println!("Auto-applied {} identifier change(s)", report.auto_applied);
    }
    for failure in &report.auto_apply_failures {
        println!("Apply failed: {}", failure);
    }
    Ok(())
}
