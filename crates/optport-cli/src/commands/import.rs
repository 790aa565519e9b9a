//! `optport import`: upload, preview, apply or cancel an import.
//!
//! Each step is its own process; the parsed upload waits in the on-disk
//! cache between `upload` and `apply`.

use clap::{Args, Subcommand};
use optport_core::{
    Config, FileCache, ImportReport, ImportSession, PreviewRow, SelectionMode, SelectionPolicy,
    StagedUpload,
};
use serde_json::json;
use std::path::PathBuf;

use super::{CliResult, Context};

#[derive(Subcommand)]
pub enum ImportAction {
    /// Validate an export file and keep it for a later `apply`
    Upload {
        /// Export file to import
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the options a pending import offers
    Preview {
        /// Import id printed by `upload`
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Apply a pending import
    Apply {
        /// Import id printed by `upload`
        id: String,
        #[command(flatten)]
        selection: SelectionArgs,
        #[arg(long)]
        json: bool,
    },
    /// Upload and apply in one step
    Run {
        file: PathBuf,
        #[command(flatten)]
        selection: SelectionArgs,
        #[arg(long)]
        json: bool,
    },
    /// Discard a pending import
    Cancel { id: String },
}

#[derive(Args)]
pub struct SelectionArgs {
    /// Which options to import: default, all or specific
    #[arg(long)]
    mode: Option<SelectionMode>,
    /// Option to import; repeat for several (implies `--mode specific`)
    #[arg(long = "key", value_name = "NAME")]
    keys: Vec<String>,
    /// Overwrite options that already exist
    #[arg(long = "override")]
    override_existing: bool,
}

impl SelectionArgs {
    fn policy(self) -> SelectionPolicy {
        let mode = self.mode.unwrap_or(if self.keys.is_empty() {
            SelectionMode::Default
        } else {
            SelectionMode::Specific
        });
        SelectionPolicy {
            mode,
            specific_keys: self.keys,
            override_existing: self.override_existing,
        }
    }
}

pub fn run(ctx: &Context, action: ImportAction) -> CliResult {
    let config = ctx.load_config()?;
    let mut store = ctx.open_store(&config)?;
    let mut cache = FileCache::new(Config::cache_dir()?)?;
    let filters = ctx.filters(&config)?;
    let mut session = ImportSession::new(&mut store, &mut cache, &filters);

    match action {
        ImportAction::Upload { file, json } => {
            let mut uploads = StagedUpload::new(file, Config::staging_dir()?);
            let pending = session.upload(&mut uploads)?;
            let rows = session.preview(&pending.id)?;
            if json {
                let out = json!({
                    "id": pending.id,
                    "version": pending.document.version,
                    "options": rows,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("Import id: {}", pending.id);
                print_preview(&rows);
                println!();
                println!("Apply with: optport import apply {}", pending.id);
            }
        }
        ImportAction::Preview { id, json } => {
            let rows = session.preview(&id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print_preview(&rows);
            }
        }
        ImportAction::Apply {
            id,
            selection,
            json,
        } => {
            let report = session.apply(&id, &selection.policy())?;
            print_report(&report, json)?;
        }
        ImportAction::Run {
            file,
            selection,
            json,
        } => {
            let mut uploads = StagedUpload::new(file, Config::staging_dir()?);
            let report = session.run(&mut uploads, &selection.policy())?;
            print_report(&report, json)?;
        }
        ImportAction::Cancel { id } => {
            session.cancel(&id)?;
            println!("Import {id} discarded");
        }
    }
    Ok(())
}

fn print_preview(rows: &[PreviewRow]) {
    if rows.is_empty() {
        println!("No importable options in this file.");
        return;
    }
    println!("{:<3} {:<40} {:<8} VALUE", "SEL", "NAME", "EXISTS");
    for row in rows {
        let value = row.value.lines().next().unwrap_or_default();
        let value = if value.chars().count() > 60 {
            format!("{}...", value.chars().take(57).collect::<String>())
        } else {
            value.to_string()
        };
        println!(
            "{:<3} {:<40} {:<8} {}",
            if row.preselected { "*" } else { "" },
            row.name,
            if row.exists { "yes" } else { "no" },
            value
        );
    }
}

fn print_report(report: &ImportReport, as_json: bool) -> CliResult {
    if as_json {
        let outcomes: Vec<_> = report
            .outcomes
            .iter()
            .map(|(name, outcome)| {
                json!({
                    "name": name,
                    "status": outcome.status(),
                    "message": outcome.to_string(),
                })
            })
            .collect();
        let out = json!({
            "id": report.id,
            "mode": report.mode,
            "override_existing": report.override_existing,
            "applied": report.applied(),
            "skipped": report.skipped(),
            "failed": report.failed(),
            "outcomes": outcomes,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for (name, outcome) in &report.outcomes {
        println!("{name}: {outcome}");
    }
    println!(
        "{} imported, {} skipped, {} failed",
        report.applied(),
        report.skipped(),
        report.failed()
    );
    Ok(())
}
