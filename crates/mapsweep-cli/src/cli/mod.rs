//! CLI for the mapsweep batch orchestrator.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mapsweep_core::config;
use std::path::PathBuf;

use commands::run_batch;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "mapsweep")]
#[command(about = "mapsweep: resumable batch scraping of industries across locations", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run every industry × location pair not yet completed.
    Run {
        /// Locations file, one `name,population,lat,long` per line.
        #[arg(long, value_name = "PATH")]
        locations_file: PathBuf,

        /// Industries file, one search query per line.
        #[arg(long, value_name = "PATH")]
        industries_file: PathBuf,

        /// Run browser workers headless (1) or visible (0).
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1))]
        headless_mode: u8,

        /// Config file to use instead of ~/.config/mapsweep/config.toml.
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// Dispatch the parsed command. Returns the process exit code.
    pub async fn execute(self) -> Result<i32> {
        match self.command {
            CliCommand::Run {
                locations_file,
                industries_file,
                headless_mode,
                config: config_path,
            } => {
                let cfg = match config_path {
                    Some(path) => config::load_from_path(&path)?,
                    None => config::load_or_init()?,
                };
                tracing::debug!("loaded config: {:?}", cfg);
                run_batch(&cfg, &locations_file, &industries_file, headless_mode == 1).await
            }
        }
    }
}

#[cfg(test)]
mod tests;
