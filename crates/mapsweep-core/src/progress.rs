//! Durable checkpoint of completed `(industry, location)` pairs.
//!
//! On disk this is a JSON object mapping each industry to the array of
//! location names already completed for it. The store is loaded once at
//! startup and owned by the batch control loop, which is its only writer.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::error::PersistenceError;
use crate::storage;

/// `industry → set of completed location names`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressRecord {
    industries: BTreeMap<String, BTreeSet<String>>,
}

impl ProgressRecord {
    pub fn is_done(&self, industry: &str, location: &str) -> bool {
        self.industries
            .get(industry)
            .is_some_and(|done| done.contains(location))
    }

    /// Returns true if the pair was not already recorded.
    pub fn mark_done(&mut self, industry: &str, location: &str) -> bool {
        self.industries
            .entry(industry.to_string())
            .or_default()
            .insert(location.to_string())
    }

    pub fn completed(&self, industry: &str) -> impl Iterator<Item = &str> {
        self.industries
            .get(industry)
            .into_iter()
            .flat_map(|done| done.iter().map(String::as_str))
    }

    pub fn completed_count(&self, industry: &str) -> usize {
        self.industries.get(industry).map_or(0, BTreeSet::len)
    }
}

/// Progress record bound to its checkpoint file.
#[derive(Debug)]
pub struct ProgressStore {
    path: PathBuf,
    record: ProgressRecord,
}

impl ProgressStore {
    /// Load the checkpoint at `path`. A missing file is an empty record.
    pub fn load(path: &Path) -> Result<Self, PersistenceError> {
        let record = match std::fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| {
                PersistenceError::Parse {
                    path: path.to_path_buf(),
                    source,
                }
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ProgressRecord::default(),
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        tracing::debug!(path = %path.display(), "loaded progress checkpoint");
        Ok(Self {
            path: path.to_path_buf(),
            record,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self) -> &ProgressRecord {
        &self.record
    }

    pub fn is_done(&self, industry: &str, location: &str) -> bool {
        self.record.is_done(industry, location)
    }

    /// Idempotent; only the in-memory record changes until [`flush`](Self::flush).
    pub fn mark_done(&mut self, industry: &str, location: &str) -> bool {
        self.record.mark_done(industry, location)
    }

    pub fn completed_count(&self, industry: &str) -> usize {
        self.record.completed_count(industry)
    }

    /// Atomically replace the checkpoint file with the full record.
    pub fn flush(&self) -> Result<(), PersistenceError> {
        let json = serde_json::to_vec_pretty(&self.record).map_err(|source| {
            PersistenceError::Encode {
                path: self.path.clone(),
                source,
            }
        })?;
        storage::write_atomic(&self.path, &json).map_err(|source| PersistenceError::Write {
            path: self.path.clone(),
            source,
        })
    }
}
