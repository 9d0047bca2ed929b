mod commands;
mod error;
mod util;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

use crate::commands::{
    backup, completions, dedupe, ids, import, phones, reconcile, show, Context,
};
use crate::error::{exit_code_for, report_error};
use rollcall_config as config;
use rollcall_store::{paths, Store};

#[derive(Debug, Parser)]
#[command(name = "rollcall", version, about = "rollcall CLI")]
struct Cli {
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    json: bool,
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate shell completions
    Completions(completions::CompletionsArgs),
    /// Load a CSV export into a sheet
    Import(import::ImportArgs),
    /// Match the import sheet against the roster and annotate drift
    Reconcile(reconcile::ReconcileArgs),
    /// Review and apply queued identifier changes
    #[command(subcommand)]
    Ids(ids::IdsCommand),
    /// Canonicalize phone columns in place
    #[command(name = "normalize-phones")]
    NormalizePhones(phones::NormalizePhonesArgs),
    /// Clear member contact values duplicated from parents
    #[command(name = "dedupe-contacts")]
    DedupeContacts(dedupe::DedupeContactsArgs),
    /// Print a sheet
    Show(show::ShowArgs),
    Backup(backup::BackupArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.verbose;
    init_logging(verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err, verbose);
            exit_code_for(&err)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let Cli {
        db_path,
        config: config_path,
        json,
        verbose,
        command,
    } = cli;

    match command {
        Command::Completions(args) => completions::emit(args),
        command => {
            let app_config = config::load(config_path.clone()).with_context(|| "load config")?;
            if verbose {
                match config::resolve_config_path(config_path) {
                    Ok(path) => {
                        if path.exists() {
                            debug!(path = %path.display(), "config resolved");
                        } else {
                            debug!(path = %path.display(), "config missing, using defaults");
                        }
                    }
                    Err(err) => {
                        debug!(error = %err, "config unavailable");
                    }
                }
            }
            let db_path =
                paths::resolve_db_path(db_path).with_context(|| "resolve database path")?;

            if verbose {
                debug!(path = %db_path.display(), "database path resolved");
            }

            let store = Store::open(&db_path)
                .with_context(|| format!("open database {}", db_path.display()))?;
            store.migrate().with_context(|| "run migrations")?;

            let ctx = Context {
                store: &store,
                json,
                config: &app_config,
            };

            match command {
                Command::Import(args) => import::import(&ctx, args),
                Command::Reconcile(args) => reconcile::reconcile(&ctx, args),
                Command::Ids(cmd) => match cmd {
                    ids::IdsCommand::List(args) => ids::list(&ctx, args),
                    ids::IdsCommand::Apply(args) => ids::apply(&ctx, args),
                    ids::IdsCommand::Dismiss(args) => ids::dismiss(&ctx, args),
                },
                Command::NormalizePhones(args) => phones::normalize_phones(&ctx, args),
                Command::DedupeContacts(args) => dedupe::dedupe_contacts(&ctx, args),
                Command::Show(args) => show::show(&ctx, args),
                Command::Backup(args) => backup::backup(&ctx, args),
                Command::Completions(_) => {
                    unreachable!("completions command handled before store initialization")
                }
            }
        }
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .try_init();
}
