use crate::commands::{print_json, Context};
use crate::error::invalid_input;
use crate::util::now_utc;
use anyhow::Result;
use clap::{Args, Subcommand};
use rollcall_core::reconcile::apply::apply_identifier_updates;
use rollcall_core::reconcile::diff::IdentifierChange;
use rollcall_core::TableStore;
use rollcall_store::repo::{PendingChange, PendingStatus};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Subcommand)]
pub enum IdsCommand {
    /// List queued identifier changes
    List(ListArgs),
    /// Write approved changes back onto the roster
    Apply(ApplyArgs),
    /// Drop a queued change without applying it
    Dismiss(DismissArgs),
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long, help = "Filter by status: open|applied|dismissed|failed|all")]
    pub status: Option<String>,
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    #[arg(long, help = "Apply a specific change id (repeatable)")]
    pub id: Vec<i64>,
    #[arg(long, help = "Apply every open change")]
    pub all: bool,
    #[arg(long, help = "Skip confirmation (required when confirmation is configured)")]
    pub yes: bool,
}

#[derive(Debug, Args)]
pub struct DismissArgs {
    pub id: i64,
}

#[derive(Debug, Serialize)]
struct PendingChangeReport {
    id: i64,
    status: String,
    sheet: String,
    target_row: i64,
    old_id: String,
    new_id: String,
    display_name: String,
    failure: Option<String>,
}

impl From<&PendingChange> for PendingChangeReport {
    fn from(change: &PendingChange) -> Self {
        Self {
            id: change.id,
            status: change.status.as_str().to_string(),
            sheet: change.sheet.clone(),
            target_row: change.target_row,
            old_id: change.old_id.clone(),
            new_id: change.new_id.clone(),
            display_name: change.display_name.clone(),
            failure: change.failure.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ApplyReport {
    applied: Vec<PendingChangeReport>,
    failed: Vec<PendingChangeReport>,
}

pub fn list(ctx: &Context<'_>, args: ListArgs) -> Result<()> {
    let status = match args.status.as_deref() {
        None => Some(PendingStatus::Open),
        Some("all") => None,
        Some(raw) => Some(
            raw.parse::<PendingStatus>()
                .map_err(|_| invalid_input(format!("unknown status: {raw}")))?,
        ),
    };

    let changes = ctx.store.pending_changes().list(status)?;
    let reports: Vec<PendingChangeReport> = changes.iter().map(PendingChangeReport::from).collect();

    if ctx.json {
        return print_json(&reports);
    }

    if reports.is_empty() {
        println!("No identifier changes.");
        return Ok(());
    }
    for report in &reports {
        println!(
            "{:>4}  [{}] {}: {} -> {} (sheet {}, row {})",
            report.id,
            report.status,
            report.display_name,
            report.old_id,
            report.new_id,
            report.sheet,
            report.target_row
        );
        if let Some(failure) = &report.failure {
            println!("      failure: {failure}");
        }
    }
    Ok(())
}

pub fn apply(ctx: &Context<'_>, args: ApplyArgs) -> Result<()> {
    if args.all != args.id.is_empty() {
        // both set or neither set
        return Err(invalid_input("pass either --all or at least one --id"));
    }
    if ctx.config.confirm_identifier_changes && !args.yes {
        return Err(invalid_input(
            "ids apply requires --yes while confirm_identifier_changes is set",
        ));
    }

    let targets: Vec<PendingChange> = if args.all {
        ctx.store.pending_changes().list_open()?
    } else {
        let mut targets = Vec::new();
        for id in &args.id {
            let change = ctx
                .store
                .pending_changes()
                .get(*id)?
                .ok_or_else(|| invalid_input(format!("no pending change with id {id}")))?;
            if change.status != PendingStatus::Open {
                return Err(invalid_input(format!("pending change {id} is not open")));
            }
            targets.push(change);
        }
        targets
    };

    let now = now_utc();
    let mut report = ApplyReport {
        applied: Vec::new(),
        failed: Vec::new(),
    };

    // Changes are grouped per target sheet; each event stands alone, so one
    // failed write never blocks the rest.
    let mut by_sheet: BTreeMap<String, Vec<PendingChange>> = BTreeMap::new();
    for change in targets {
        by_sheet.entry(change.sheet.clone()).or_default().push(change);
    }

    let store: &dyn TableStore = ctx.store;
    for (sheet, changes) in by_sheet {
        let events: Vec<IdentifierChange> = changes
            .iter()
            .map(|change| IdentifierChange {
                old_id: change.old_id.clone(),
                new_id: change.new_id.clone(),
                display_name: change.display_name.clone(),
                roster_row: change.target_row as usize,
            })
            .collect();
        let outcomes = apply_identifier_updates(
            store,
            &sheet,
            &ctx.config.key_columns.identifier,
            events,
        );
        for (change, outcome) in changes.iter().zip(outcomes) {
            match outcome.error {
                None => {
                    ctx.store.pending_changes().mark_applied(now, change.id)?;
                    let mut resolved = change.clone();
                    resolved.status = PendingStatus::Applied;
                    report.applied.push(PendingChangeReport::from(&resolved));
                }
                Some(err) => {
                    let message = err.to_string();
                    ctx.store
                        .pending_changes()
                        .mark_failed(now, change.id, &message)?;
                    let mut resolved = change.clone();
                    resolved.status = PendingStatus::Failed;
                    resolved.failure = Some(message);
                    report.failed.push(PendingChangeReport::from(&resolved));
                }
            }
        }
    }

    if ctx.json {
        return print_json(&report);
    }

    println!(
        "Applied {} identifier change(s), {} failed",
        report.applied.len(),
        report.failed.len()
    );
    for failed in &report.failed {
        println!(
            "Failed {}: {} -> {}: {}",
            failed.display_name,
            failed.old_id,
            failed.new_id,
            failed.failure.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

pub fn dismiss(ctx: &Context<'_>, args: DismissArgs) -> Result<()> {
    ctx.store.pending_changes().dismiss(now_utc(), args.id)?;
    if ctx.json {
        let change = ctx.store.pending_changes().get(args.id)?;
        if let Some(change) = change {
            return print_json(&PendingChangeReport::from(&change));
        }
        return Ok(());
    }
    println!("Dismissed identifier change {}", args.id);
    Ok(())
}
