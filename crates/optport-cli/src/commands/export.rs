//! `optport export`: write the store's settings to an export document.

use clap::Args;
use optport_core::{export_filename, Exporter};
use std::fs;
use std::path::PathBuf;

use super::{CliResult, Context};

#[derive(Args)]
pub struct ExportArgs {
    /// Output file (defaults to `<site>.wp_options.<date>.json` in the
    /// current directory)
    #[arg(short, long, conflicts_with = "stdout")]
    output: Option<PathBuf>,
    /// Print the document to stdout instead of writing a file
    #[arg(long)]
    stdout: bool,
    /// Site name used in the default filename (overrides `site.name`)
    #[arg(long)]
    site_name: Option<String>,
}

pub fn run(ctx: &Context, args: ExportArgs) -> CliResult {
    let config = ctx.load_config()?;
    let store = ctx.open_store(&config)?;
    let filters = ctx.filters(&config)?;

    let document = Exporter::new(&store, &filters).build_document()?;
    let json = document.to_json()?;

    if args.stdout {
        println!("{json}");
        return Ok(());
    }

    let site_name = args.site_name.unwrap_or(config.site.name);
    let path = args.output.unwrap_or_else(|| {
        PathBuf::from(export_filename(&site_name, chrono::Local::now().date_naive()))
    });
    fs::write(&path, &json)?;
    println!(
        "Exported {} option(s) to: {}",
        document.options.len(),
        path.display()
    );
    Ok(())
}
