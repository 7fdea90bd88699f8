#![allow(dead_code)]

pub mod fake_worker;

use mapsweep_core::config::ResultKeyStyle;
use mapsweep_core::monitor::{Ceilings, ResourceMonitor, Telemetry};
use mapsweep_core::progress::ProgressStore;
use mapsweep_core::results::{DuplicatePolicy, ResultAggregator, ResultStore};
use mapsweep_core::retry::RetryPolicy;
use mapsweep_core::runner::JobRunner;
use mapsweep_core::scheduler::{AdmissionController, BatchOrchestrator};
use mapsweep_core::worker::{ResultRecord, SessionFactory};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Concurrency bounds `(min, max, initial)`.
pub type Limits = (usize, usize, usize);

pub fn progress_path(dir: &Path) -> PathBuf {
    dir.join("progress.json")
}

pub fn output_dir(dir: &Path) -> PathBuf {
    dir.join("output")
}

/// Orchestrator over `dir` with no retry backoff and an 80% CPU ceiling.
pub fn orchestrator(
    dir: &Path,
    factory: Arc<dyn SessionFactory>,
    telemetry: impl Telemetry + 'static,
    (min, max, initial): Limits,
) -> BatchOrchestrator {
    orchestrator_with_output(dir, &output_dir(dir), factory, telemetry, (min, max, initial))
}

pub fn orchestrator_with_output(
    dir: &Path,
    output: &Path,
    factory: Arc<dyn SessionFactory>,
    telemetry: impl Telemetry + 'static,
    (min, max, initial): Limits,
) -> BatchOrchestrator {
    let retry = RetryPolicy {
        max_attempts: 3,
        backoff: Duration::ZERO,
    };
    let runner = JobRunner::new(factory, retry, true);
    let monitor = ResourceMonitor::new(
        Box::new(telemetry),
        Ceilings {
            cpu_pct: 80.0,
            ram_bytes: u64::MAX,
        },
    );
    let progress = ProgressStore::load(&progress_path(dir)).unwrap();
    let results = ResultAggregator::new(
        ResultStore::new(output, DuplicatePolicy::Append),
        ResultKeyStyle::Industry,
        0,
    );
    BatchOrchestrator::new(
        runner,
        AdmissionController::new(min, max, initial),
        monitor,
        progress,
        results,
    )
}

/// Records in `output/<industry>.json`; empty if the file does not exist.
pub fn result_file(dir: &Path, industry: &str) -> Vec<ResultRecord> {
    match std::fs::read(output_dir(dir).join(format!("{}.json", industry))) {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => panic!("read result file: {}", e),
    }
}

pub fn industries(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}
