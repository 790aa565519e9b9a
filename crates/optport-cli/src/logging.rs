//! Log output for the CLI.
//!
//! Logs go to stderr so stdout stays clean for JSON and exported documents.

use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding a filter directive, e.g. `optport_core=debug`.
pub const LOG_ENV: &str = "OPTPORT_LOG";

/// Install the global subscriber.
///
/// `OPTPORT_LOG` wins over the `-v` count. Without either only warnings and
/// errors are shown.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    // A second init (e.g. from tests) is harmless.
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}
