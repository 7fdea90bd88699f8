//! Runs one job end-to-end against the external worker.

use std::sync::Arc;

use crate::error::JobError;
use crate::job::Job;
use crate::retry::{run_with_retry, RetryPolicy};
use crate::worker::{ResultRecord, SessionFactory, SessionSpec};

/// Minimum records for a job's results to be kept, unless configured.
pub const DEFAULT_MIN_RECORDS: usize = 5;

/// Opens a worker session per job (retrying start-up failures), collects
/// its records, and always closes the session.
pub struct JobRunner {
    factory: Arc<dyn SessionFactory>,
    retry: RetryPolicy,
    headless: bool,
    min_records: usize,
}

impl std::fmt::Debug for JobRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRunner")
            .field("retry", &self.retry)
            .field("headless", &self.headless)
            .field("min_records", &self.min_records)
            .finish_non_exhaustive()
    }
}

impl JobRunner {
    pub fn new(factory: Arc<dyn SessionFactory>, retry: RetryPolicy, headless: bool) -> Self {
        Self {
            factory,
            retry,
            headless,
            min_records: DEFAULT_MIN_RECORDS,
        }
    }

    pub fn with_min_records(mut self, min_records: usize) -> Self {
        self.min_records = min_records;
        self
    }

    pub fn min_records(&self) -> usize {
        self.min_records
    }

    /// Execute `job`. Fewer than `min_records` records is reported as
    /// [`JobError::InsufficientData`] and the records are dropped.
    pub async fn run(&self, job: &Job) -> Result<Vec<ResultRecord>, JobError> {
        let spec = SessionSpec::for_job(job, self.headless);
        let factory = self.factory.as_ref();
        let spec_ref = &spec;

        let mut session = run_with_retry(&self.retry, || factory.open(spec_ref))
            .await
            .map_err(|e| JobError::WorkerInit {
                attempts: e.attempts,
                source: e.last_error,
            })?;

        tracing::debug!(job = %job, url = %spec.search_url(), "worker session started");
        let collected = session.collect().await;
        session.close().await;
        let records = collected?;

        if records.len() < self.min_records {
            return Err(JobError::InsufficientData {
                found: records.len(),
                min: self.min_records,
            });
        }
        Ok(records)
    }
}
