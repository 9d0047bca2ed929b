use crate::commands::{print_json, Context};
use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;

#[derive(Debug, Args)]
pub struct ShowArgs {
    pub sheet: String,
}

#[derive(Debug, Serialize)]
struct SheetReport {
    sheet: String,
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

pub fn show(ctx: &Context<'_>, args: ShowArgs) -> Result<()> {
    let table = ctx
        .store
        .sheets()
        .read_table(&args.sheet)
        .with_context(|| format!("read sheet {}", args.sheet))?;

    let report = SheetReport {
        sheet: args.sheet,
        header: table.header().to_vec(),
        rows: table
            .rows()
            .iter()
            .map(|cells| cells.iter().map(|cell| cell.as_text()).collect())
            .collect(),
    };

    if ctx.json {
        return print_json(&report);
    }

    println!("{}", report.header.join("\t"));
    for row in &report.rows {
        println!("{}", row.join("\t"));
    }
    Ok(())
}
