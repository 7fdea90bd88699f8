use clap::Parser;
use mapsweep_core::logging;

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    // Initialize logging as early as possible; fall back to stderr.
    if let Err(e) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("log file unavailable ({:#}); logging to stderr", e);
    }

    match Cli::parse().execute().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("mapsweep error: {:#}", err);
            std::process::exit(1);
        }
    }
}
