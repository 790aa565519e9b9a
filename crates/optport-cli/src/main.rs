use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "optport", version, about = "Export and import site settings")]
struct Cli {
    /// Settings store to use instead of the configured one
    #[arg(long, global = true, value_name = "PATH")]
    store: Option<PathBuf>,

    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export settings to a JSON file
    Export(commands::export::ExportArgs),
    /// Import settings from an export file
    Import {
        #[command(subcommand)]
        action: commands::import::ImportAction,
    },
    /// Inspect and edit individual settings in the store
    #[command(name = "option")]
    Opt {
        #[command(subcommand)]
        action: commands::option::OptionAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Show tool and export format versions
    Version,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let ctx = commands::Context::new(cli.store);
    let result = match cli.command {
        Commands::Export(args) => commands::export::run(&ctx, args),
        Commands::Import { action } => commands::import::run(&ctx, action),
        Commands::Opt { action } => commands::option::run(&ctx, action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Version => {
            commands::print_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::debug!(error = ?e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
