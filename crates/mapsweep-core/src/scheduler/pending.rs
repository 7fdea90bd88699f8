//! Per-location bookkeeping of jobs still in flight.

use std::collections::HashMap;

/// How a location ended once its last job returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationOutcome {
    /// Every job succeeded or was below the record threshold.
    Complete,
    /// At least one job failed terminally.
    Failed,
}

#[derive(Debug)]
struct Outstanding {
    jobs: usize,
    failed: bool,
}

/// Outstanding job count and failure flag per location of one industry.
#[derive(Debug, Default)]
pub struct LocationTracker {
    locations: HashMap<String, Outstanding>,
}

impl LocationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `location` with `jobs` jobs queued.
    pub fn begin(&mut self, location: &str, jobs: usize) {
        self.locations.insert(
            location.to_string(),
            Outstanding {
                jobs,
                failed: false,
            },
        );
    }

    /// Record one finished job. Returns the location's outcome when this
    /// was its last job.
    pub fn finish(&mut self, location: &str, failed: bool) -> Option<LocationOutcome> {
        let entry = self.locations.get_mut(location)?;
        entry.failed |= failed;
        entry.jobs = entry.jobs.saturating_sub(1);
        if entry.jobs > 0 {
            return None;
        }
        let failed = entry.failed;
        self.locations.remove(location);
        Some(if failed {
            LocationOutcome::Failed
        } else {
            LocationOutcome::Complete
        })
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Stop tracking every location; returns their names.
    pub fn abandon(&mut self) -> Vec<String> {
        let mut names: Vec<String> = self.locations.drain().map(|(name, _)| name).collect();
        names.sort();
        names
    }
}
