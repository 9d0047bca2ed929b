use crate::commands::{print_json, Context};
use crate::util::now_utc;
use anyhow::{Context as _, Result};
use clap::Args;
use rollcall_core::reconcile::dedupe::dedupe_table;
use serde::Serialize;

#[derive(Debug, Args)]
pub struct DedupeContactsArgs {
    #[arg(long, help = "Sheet to dedupe (defaults to the configured import sheet)")]
    pub sheet: Option<String>,
}

#[derive(Debug, Serialize)]
struct DedupeReport {
    sheet: String,
    rows_changed: usize,
}

pub fn dedupe_contacts(ctx: &Context<'_>, args: DedupeContactsArgs) -> Result<()> {
    let sheet = args
        .sheet
        .unwrap_or_else(|| ctx.config.import_sheet.clone());
    let mut table = ctx
        .store
        .sheets()
        .read_table(&sheet)
        .with_context(|| format!("read sheet {sheet}"))?;

    let columns = &ctx.config.contact_columns;
    let changed_rows = dedupe_table(&mut table, columns);

    if !changed_rows.is_empty() {
        // Only the three member-side columns can change.
        let now = now_utc();
        for column in [
            &columns.member_mobile,
            &columns.member_email,
            &columns.additional_emails,
        ] {
            let Some(values) = table.column_values(column) else {
                continue;
            };
            ctx.store
                .sheets()
                .write_column(now, &sheet, column, &values)
                .with_context(|| format!("write column {column}"))?;
        }
    }

    let report = DedupeReport {
        sheet,
        rows_changed: changed_rows.len(),
    };

    if ctx.json {
        return print_json(&report);
    }

    if report.rows_changed == 0 {
        println!("No duplicated contact values found in sheet {}", report.sheet);
    } else {
        println!(
            "Cleared duplicated contact values on {} row(s) in sheet {}",
            report.rows_changed, report.sheet
        );
    }
    Ok(())
}
