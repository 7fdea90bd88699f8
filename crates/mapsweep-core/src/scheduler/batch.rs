//! The batch control loop.
//!
//! Industries run one after another. Within an industry every pending
//! location is partitioned into jobs up front; jobs are admitted through
//! the [`AdmissionController`] and run as tasks, so jobs of different
//! locations overlap. The loop alone owns the progress store and the
//! result accumulator: tasks only return records.
//!
//! A location is persisted and then checkpointed once its last job
//! returns. If a pooled task dies (panics), its job is re-run on the
//! loop itself and the rest of the run is sequential.

use anyhow::{Context, Result};
use futures::FutureExt;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};

use super::admission::{AdmissionController, AdmissionSlot};
use super::pending::{LocationOutcome, LocationTracker};
use super::report::BatchReport;
use super::shutdown::ShutdownCoordinator;
use crate::config::MapsweepConfig;
use crate::error::JobError;
use crate::job::Job;
use crate::monitor::ResourceMonitor;
use crate::progress::ProgressStore;
use crate::results::ResultAggregator;
use crate::retry::RetryPolicy;
use crate::runner::JobRunner;
use crate::sources::LocationTable;
use crate::worker::{CommandSessionFactory, ResultRecord};

type JobOutcome = Result<Vec<ResultRecord>, JobError>;

/// A job's outcome, or the panic message if the task running it died.
type Guarded = (Job, Result<JobOutcome, String>);

enum Step {
    Interrupt,
    Admitted(AdmissionSlot),
    Joined(Result<Guarded, JoinError>),
    Inline(Guarded),
}

enum Flow {
    Continue,
    Interrupted,
}

#[derive(Debug)]
pub struct BatchOrchestrator {
    runner: Arc<JobRunner>,
    admission: Arc<AdmissionController>,
    monitor: ResourceMonitor,
    progress: ProgressStore,
    results: ResultAggregator,
    shutdown: ShutdownCoordinator,
    degraded: bool,
}

impl BatchOrchestrator {
    pub fn new(
        runner: JobRunner,
        admission: AdmissionController,
        monitor: ResourceMonitor,
        progress: ProgressStore,
        results: ResultAggregator,
    ) -> Self {
        Self {
            runner: Arc::new(runner),
            admission: Arc::new(admission),
            monitor,
            progress,
            results,
            shutdown: ShutdownCoordinator::new(),
            degraded: false,
        }
    }

    /// Orchestrator for this host: worker processes from `[worker]`, host
    /// telemetry, and the configured progress and output paths.
    pub fn from_config(cfg: &MapsweepConfig, headless: bool) -> Result<Self> {
        let factory = CommandSessionFactory::from_config(&cfg.worker);
        let runner = JobRunner::new(
            Arc::new(factory),
            RetryPolicy::from_config(&cfg.retry()),
            headless,
        )
        .with_min_records(cfg.min_records);
        let admission = AdmissionController::new(
            cfg.min_concurrency,
            cfg.max_concurrency,
            cfg.initial_concurrency(),
        );
        let monitor = ResourceMonitor::for_host(cfg.cpu_ceiling_pct, cfg.ram_ceiling_bytes);
        let progress = ProgressStore::load(&cfg.progress_path())
            .context("load progress checkpoint")?;
        let results = ResultAggregator::from_config(cfg);
        Ok(Self::new(runner, admission, monitor, progress, results))
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    pub fn admission(&self) -> &Arc<AdmissionController> {
        &self.admission
    }

    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    /// Run every `industry × location` pair not yet checkpointed.
    ///
    /// Returns the run summary, with `interrupted` set if a message on
    /// `interrupts` stopped the run. A failed durable write aborts all
    /// outstanding jobs and is returned as an error.
    pub async fn run(
        &mut self,
        locations: &LocationTable,
        industries: &[String],
        mut interrupts: mpsc::Receiver<()>,
    ) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        for industry in industries {
            let flow = self
                .run_industry(industry, locations, &mut interrupts, &mut report)
                .await?;
            if let Flow::Interrupted = flow {
                break;
            }
        }
        report.degraded = self.degraded;
        report.log_summary();
        Ok(report)
    }

    async fn run_industry(
        &mut self,
        industry: &str,
        locations: &LocationTable,
        interrupts: &mut mpsc::Receiver<()>,
        report: &mut BatchReport,
    ) -> Result<Flow> {
        if locations
            .names()
            .iter()
            .all(|l| self.progress.is_done(industry, l))
        {
            tracing::info!(industry, "skipping completed industry");
            report.industries_skipped += 1;
            return Ok(Flow::Continue);
        }
        tracing::info!(industry, "processing industry");

        let mut queue = VecDeque::new();
        let mut tracker = LocationTracker::new();
        for location in locations.names() {
            if self.progress.is_done(industry, location) {
                tracing::debug!(industry, location = %location, "skipping completed location");
                continue;
            }
            let partition = match locations.partition(location) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(industry, location = %location, error = %e, "skipping location");
                    report.locations_skipped += 1;
                    continue;
                }
            };
            let jobs = Job::for_partition(industry, location, &partition);
            tracing::info!(industry, location = %location, jobs = jobs.len(), "scheduling location");
            tracker.begin(location, jobs.len());
            queue.extend(jobs);
        }

        let mut tasks: JoinSet<Guarded> = JoinSet::new();
        while !queue.is_empty() || !tasks.is_empty() {
            let inline_job = if self.degraded && tasks.is_empty() {
                queue.pop_front()
            } else {
                None
            };

            let step = match inline_job {
                Some(job) => {
                    tracing::debug!(job = %job, "running job inline");
                    let run = guarded_run(Arc::clone(&self.runner), job);
                    tokio::select! {
                        biased;
                        Some(()) = interrupts.recv() => Step::Interrupt,
                        guarded = run => Step::Inline(guarded),
                    }
                }
                None => {
                    let admit = !queue.is_empty() && !self.degraded;
                    tokio::select! {
                        biased;
                        Some(()) = interrupts.recv() => Step::Interrupt,
                        Some(joined) = tasks.join_next(), if !tasks.is_empty() => Step::Joined(joined),
                        slot = self.admission.acquire(), if admit => Step::Admitted(slot),
                    }
                }
            };

            match step {
                Step::Interrupt => {
                    self.shut_down(&mut tasks, report).await?;
                    return Ok(Flow::Interrupted);
                }
                Step::Admitted(slot) => {
                    if let Some(job) = queue.pop_front() {
                        tracing::debug!(job = %job, limit = self.admission.limit(), "dispatching job");
                        let runner = Arc::clone(&self.runner);
                        tasks.spawn(async move {
                            let _slot = slot;
                            guarded_run(runner, job).await
                        });
                    }
                }
                Step::Joined(Ok((job, Ok(outcome)))) => {
                    self.on_job_finished(job, outcome, &mut tracker, report)?;
                }
                Step::Joined(Ok((job, Err(panic)))) => {
                    tracing::error!(job = %job, panic = %panic, "job task failed; continuing sequentially");
                    self.degraded = true;
                    queue.push_front(job);
                }
                Step::Joined(Err(e)) => {
                    tracing::error!(error = %e, "job task lost; continuing sequentially");
                    self.degraded = true;
                }
                Step::Inline((job, outcome)) => {
                    let outcome = outcome.unwrap_or_else(|panic| Err(JobError::Panicked(panic)));
                    self.on_job_finished(job, outcome, &mut tracker, report)?;
                }
            }
        }

        // Only jobs lost to a dead task leave locations behind.
        for location in tracker.abandon() {
            tracing::warn!(industry, location = %location, "location has unfinished jobs; not marking done");
            report.records_persisted += self
                .results
                .flush_location(industry, &location)
                .with_context(|| format!("persist results for {} in {}", industry, location))?;
            report.locations_failed += 1;
        }
        let dropped = self.results.reset_industry(industry);
        if dropped > 0 {
            tracing::warn!(industry, records = dropped, "discarded unpersisted results");
        }
        tracing::info!(
            industry,
            completed = self.progress.completed_count(industry),
            "industry finished"
        );
        Ok(Flow::Continue)
    }

    fn on_job_finished(
        &mut self,
        job: Job,
        outcome: JobOutcome,
        tracker: &mut LocationTracker,
        report: &mut BatchReport,
    ) -> Result<()> {
        report.jobs_run += 1;
        let failed = match outcome {
            Ok(records) => {
                tracing::info!(job = %job, records = records.len(), "job finished");
                self.results.add(job.industry(), job.location(), records);
                false
            }
            Err(e) if !e.is_failure() => {
                tracing::info!(job = %job, reason = %e, "job results not kept");
                report.insufficient_jobs += 1;
                false
            }
            Err(e) => {
                tracing::warn!(job = %job, error = %e, "job failed");
                report.jobs_failed += 1;
                true
            }
        };

        self.retune();

        if let Some(outcome) = tracker.finish(job.location(), failed) {
            self.complete_location(job.industry(), job.location(), outcome, report)?;
        }
        Ok(())
    }

    /// One monitor sample per finished job; move the limit by its advice.
    fn retune(&mut self) {
        let reading = self.monitor.sample();
        let (min, max) = self.admission.bounds();
        let current = self.admission.limit();
        let next = self.monitor.recommend(current, &reading, min, max);
        if next != current {
            let limit = self.admission.adjust(next as isize - current as isize);
            tracing::debug!(
                cpu_pct = reading.cpu_pct,
                ram_bytes = reading.ram_bytes,
                limit,
                "retuned concurrency"
            );
        }
    }

    /// Persist first, then checkpoint. A failed location is persisted but
    /// stays unmarked.
    fn complete_location(
        &mut self,
        industry: &str,
        location: &str,
        outcome: LocationOutcome,
        report: &mut BatchReport,
    ) -> Result<()> {
        let written = self
            .results
            .flush_location(industry, location)
            .with_context(|| format!("persist results for {} in {}", industry, location))?;
        report.records_persisted += written;

        match outcome {
            LocationOutcome::Complete => {
                self.progress.mark_done(industry, location);
                self.progress
                    .flush()
                    .with_context(|| format!("checkpoint {} in {}", industry, location))?;
                report.locations_completed += 1;
                tracing::info!(industry, location, records = written, "location completed");
            }
            LocationOutcome::Failed => {
                report.locations_failed += 1;
                tracing::warn!(industry, location, records = written, "location had failed jobs; not marking done");
            }
        }
        Ok(())
    }

    /// Flush what has accumulated, then kill outstanding jobs.
    async fn shut_down(&mut self, tasks: &mut JoinSet<Guarded>, report: &mut BatchReport) -> Result<()> {
        if !self.shutdown.begin() {
            return Ok(());
        }
        report.interrupted = true;
        let pending = self.results.pending_records();
        tracing::info!(records = pending, in_flight = tasks.len(), "flushing accumulated results");
        let flushed = self.results.flush_all();

        // Dropping a task's session kills its worker process.
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}
        self.shutdown.finish();

        report.records_persisted += flushed.context("flush results on shutdown")?;
        Ok(())
    }
}

/// Run `job`, turning a panic into an error value.
async fn guarded_run(runner: Arc<JobRunner>, job: Job) -> Guarded {
    let outcome = AssertUnwindSafe(runner.run(&job))
        .catch_unwind()
        .await
        .map_err(|payload| panic_message(payload.as_ref()));
    (job, outcome)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
