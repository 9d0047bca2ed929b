use crate::commands::{print_json, Context};
use crate::util::now_utc;
use anyhow::{Context as _, Result};
use clap::Args;
use rollcall_core::normalize::phone::normalize_phone_columns;
use serde::Serialize;

#[derive(Debug, Args)]
pub struct NormalizePhonesArgs {
    #[arg(long, help = "Sheet to normalize (defaults to the configured import sheet)")]
    pub sheet: Option<String>,
    #[arg(long, help = "Phone column (repeatable; defaults to the configured set)")]
    pub column: Vec<String>,
}

#[derive(Debug, Serialize)]
struct NormalizePhonesReport {
    sheet: String,
    columns: Vec<String>,
    changed_cells: usize,
    invalid_cells: usize,
    skipped_columns: Vec<String>,
}

pub fn normalize_phones(ctx: &Context<'_>, args: NormalizePhonesArgs) -> Result<()> {
    let sheet = args
        .sheet
        .unwrap_or_else(|| ctx.config.import_sheet.clone());
    let columns = if args.column.is_empty() {
        ctx.config.phone_columns.clone()
    } else {
        args.column
    };

    let mut table = ctx
        .store
        .sheets()
        .read_table(&sheet)
        .with_context(|| format!("read sheet {sheet}"))?;

    let pass = normalize_phone_columns(&mut table, &columns);

    // Single batch write-back: the touched columns plus the conditional rule
    // for the renderer.
    let now = now_utc();
    for column in &pass.rule.columns {
        let Some(values) = table.column_values(column) else {
            continue;
        };
        ctx.store
            .sheets()
            .write_column(now, &sheet, column, &values)
            .with_context(|| format!("write column {column}"))?;
    }
    ctx.store
        .sheets()
        .set_validation_rule(&sheet, &pass.rule)
        .with_context(|| "store validation rule")?;

    let report = NormalizePhonesReport {
        sheet,
        columns: pass.rule.columns.clone(),
        changed_cells: pass.changed_cells,
        invalid_cells: pass.invalid_cells,
        skipped_columns: pass.skipped_columns.clone(),
    };

    if ctx.json {
        return print_json(&report);
    }

    println!(
        "Normalized {} cell(s) across {} column(s) in sheet {}",
        report.changed_cells,
        report.columns.len(),
        report.sheet
    );
    if report.invalid_cells > 0 {
        println!(
            "{} value(s) still fail the validity pattern and will be highlighted",
            report.invalid_cells
        );
    }
    for column in &report.skipped_columns {
        println!("Skipped missing column: {}", column);
    }
    Ok(())
}
