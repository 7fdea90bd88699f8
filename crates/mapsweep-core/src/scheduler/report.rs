//! Run summary returned by the batch driver.

use super::shutdown::INTERRUPT_EXIT_CODE;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Jobs that returned, including failed and below-threshold ones.
    pub jobs_run: usize,
    pub jobs_failed: usize,
    /// Jobs below the record threshold; their records were dropped.
    pub insufficient_jobs: usize,
    pub records_persisted: usize,
    pub locations_completed: usize,
    /// Locations skipped for missing population or coordinates.
    pub locations_skipped: usize,
    /// Locations with a failed job; left unmarked for the next run.
    pub locations_failed: usize,
    /// Industries already complete for every location.
    pub industries_skipped: usize,
    /// The pool failed and the run continued sequentially.
    pub degraded: bool,
    pub interrupted: bool,
}

impl BatchReport {
    pub fn exit_code(&self) -> i32 {
        if self.interrupted {
            INTERRUPT_EXIT_CODE
        } else {
            0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!(
            jobs_run = self.jobs_run,
            jobs_failed = self.jobs_failed,
            insufficient_jobs = self.insufficient_jobs,
            records_persisted = self.records_persisted,
            locations_completed = self.locations_completed,
            locations_skipped = self.locations_skipped,
            locations_failed = self.locations_failed,
            industries_skipped = self.industries_skipped,
            degraded = self.degraded,
            interrupted = self.interrupted,
            "batch finished"
        );
    }
}

impl std::fmt::Display for BatchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} job(s) run ({} failed, {} below threshold), {} record(s) persisted; \
             locations: {} completed, {} failed, {} skipped",
            self.jobs_run,
            self.jobs_failed,
            self.insufficient_jobs,
            self.records_persisted,
            self.locations_completed,
            self.locations_failed,
            self.locations_skipped,
        )?;
        if self.industries_skipped > 0 {
            write!(f, "; {} industr(ies) already complete", self.industries_skipped)?;
        }
        if self.degraded {
            f.write_str("; ran sequentially after a pool failure")?;
        }
        if self.interrupted {
            f.write_str("; interrupted")?;
        }
        Ok(())
    }
}
