//! Error taxonomy for batch jobs, input data, and durable state.
//!
//! Job-scoped errors never abort the batch; persistence errors do, since the
//! checkpoint can only be advanced after a successful write.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The external worker could not be started.
#[derive(Debug, Error)]
#[error("worker failed to start: {message}")]
pub struct WorkerInitError {
    pub message: String,
}

impl WorkerInitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A started worker failed while collecting results.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("worker i/o: {0}")]
    Io(#[from] io::Error),
    /// Output that does not follow the worker line protocol.
    #[error("worker protocol: {0}")]
    Protocol(String),
    /// The worker itself reported a failure.
    #[error("worker reported: {0}")]
    Worker(String),
}

/// Outcome of one job other than a usable record list.
#[derive(Debug, Error)]
pub enum JobError {
    /// Worker start failed on every attempt. Terminal for this job only.
    #[error("worker failed to start after {attempts} attempt(s): {source}")]
    WorkerInit {
        attempts: u32,
        #[source]
        source: WorkerInitError,
    },
    #[error(transparent)]
    Session(#[from] SessionError),
    /// Fewer records than the configured minimum. Not a failure: the
    /// location is still checkpointed, the records are not persisted.
    #[error("insufficient data: {found} record(s), need at least {min}")]
    InsufficientData { found: usize, min: usize },
    /// The job's own code panicked while running on the control loop.
    #[error("job panicked: {0}")]
    Panicked(String),
}

impl JobError {
    /// False only for `InsufficientData`.
    pub fn is_failure(&self) -> bool {
        !matches!(self, JobError::InsufficientData { .. })
    }
}

/// Missing or invalid population/coordinate data for a location.
/// The location is skipped and stays eligible for the next run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PartitionInputError {
    #[error("location {location} is not in the locations source")]
    UnknownLocation { location: String },
    #[error("no population data for {location}")]
    MissingPopulation { location: String },
    #[error("no coordinates for {location} (needed for {divisions} subregions)")]
    MissingCoordinates { location: String, divisions: usize },
}

/// A durable read or write of progress or results failed.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("encode {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_is_not_a_failure() {
        let e = JobError::InsufficientData { found: 3, min: 5 };
        assert!(!e.is_failure());
        assert_eq!(e.to_string(), "insufficient data: 3 record(s), need at least 5");
    }

    #[test]
    fn worker_init_is_a_failure() {
        let e = JobError::WorkerInit {
            attempts: 3,
            source: WorkerInitError::new("chrome not found"),
        };
        assert!(e.is_failure());
        assert!(e.to_string().contains("after 3 attempt(s)"));
        assert!(JobError::from(SessionError::Worker("blocked".into())).is_failure());
    }
}
