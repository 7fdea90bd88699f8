//! `mapsweep run`: drive the whole batch until done or interrupted.

use anyhow::Result;
use mapsweep_core::config::MapsweepConfig;
use mapsweep_core::scheduler::{spawn_interrupt_listener, BatchOrchestrator};
use mapsweep_core::sources::{read_industries, LocationTable};
use std::path::Path;

pub async fn run_batch(
    cfg: &MapsweepConfig,
    locations_file: &Path,
    industries_file: &Path,
    headless: bool,
) -> Result<i32> {
    let locations = LocationTable::load(locations_file)?;
    let industries = read_industries(industries_file)?;
    if locations.is_empty() || industries.is_empty() {
        println!("Nothing to do: no locations or no industries.");
        return Ok(0);
    }
    tracing::info!(
        locations = locations.len(),
        industries = industries.len(),
        headless,
        "starting batch"
    );

    let mut orchestrator = BatchOrchestrator::from_config(cfg, headless)?;
    let interrupts = spawn_interrupt_listener();
    let report = orchestrator.run(&locations, &industries, interrupts).await?;

    println!("{}", report);
    if report.interrupted {
        println!("Interrupted; accumulated results were saved. Rerun to resume.");
    }
    Ok(report.exit_code())
}
