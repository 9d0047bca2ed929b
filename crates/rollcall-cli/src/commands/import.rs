use crate::commands::{print_json, Context};
use crate::util::now_utc;
use anyhow::{Context as _, Result};
use clap::Args;
use rollcall_import::csv::parse_csv;
use rollcall_import::source::{ExportSource, FileSource};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ImportArgs {
    pub file: PathBuf,
    #[arg(long, help = "Target sheet (defaults to the configured import sheet)")]
    pub sheet: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImportReport {
    sheet: String,
    rows: usize,
    columns: usize,
    warnings: Vec<String>,
}

pub fn import(ctx: &Context<'_>, args: ImportArgs) -> Result<()> {
    let source = FileSource::new(&args.file);
    let data = source
        .fetch_export()
        .with_context(|| format!("read export file {}", args.file.display()))?;
    let parsed = parse_csv(&data)
        .with_context(|| format!("parse export file {}", args.file.display()))?;

    let sheet = args
        .sheet
        .unwrap_or_else(|| ctx.config.import_sheet.clone());
    ctx.store
        .sheets()
        .replace_table(now_utc(), &sheet, &parsed.table)
        .with_context(|| format!("store sheet {sheet}"))?;

    let report = ImportReport {
        sheet,
        rows: parsed.table.row_count(),
        columns: parsed.table.header().len(),
        warnings: parsed.warnings,
    };

    if ctx.json {
        return print_json(&report);
    }

    println!(
        "Imported {} row(s), {} column(s) into sheet {}",
        report.rows, report.columns, report.sheet
    );
    if !report.warnings.is_empty() {
        println!("Warnings:");
        for warning in &report.warnings {
            println!("- {}", warning);
        }
    }
    Ok(())
}
