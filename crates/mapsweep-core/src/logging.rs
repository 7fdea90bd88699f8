//! Logging init: file under XDG state dir, or fallback to stderr.
//!
//! Worker processes have their own output; only the orchestrator logs here.

use anyhow::Result;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,mapsweep=debug,mapsweep_core=debug";

/// `RUST_LOG` if set, else [`DEFAULT_FILTER`].
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn install(writer: BoxMakeWriter) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .init();
}

/// Log to `$XDG_STATE_HOME/mapsweep/mapsweep.log` (appending). Returns the
/// log path. On failure (e.g. state dir unwritable) returns Err so the
/// caller can fall back to [`init_logging_stderr`].
pub fn init_logging() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mapsweep")?;
    let log_file_path = xdg_dirs.place_state_file("mapsweep.log")?;
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)?;

    install(BoxMakeWriter::new(Mutex::new(file)));
    tracing::info!("mapsweep logging initialized at {}", log_file_path.display());
    Ok(log_file_path)
}

/// Log to stderr only.
pub fn init_logging_stderr() {
    install(BoxMakeWriter::new(io::stderr));
}
