//! Batch result accumulation and durable result files.
//!
//! Finished jobs hand their records to the [`ResultAggregator`], which
//! holds them per `(industry, location)` until the location's last job
//! returns and then persists them under the industry's [`QueryKey`]. On
//! shutdown, everything still pending is flushed in one pass.

mod key;
mod policy;
mod store;

pub use key::{run_stamp_now, sanitize_stem, QueryKey};
pub use policy::DuplicatePolicy;
pub use store::ResultStore;

use std::collections::BTreeMap;

use crate::config::{MapsweepConfig, ResultKeyStyle};
use crate::error::PersistenceError;
use crate::worker::ResultRecord;

/// `existing` followed by `new`. No deduplication.
pub fn accumulate(mut existing: Vec<ResultRecord>, new: Vec<ResultRecord>) -> Vec<ResultRecord> {
    existing.extend(new);
    existing
}

/// In-memory accumulator owned by the batch control loop.
#[derive(Debug)]
pub struct ResultAggregator {
    store: ResultStore,
    key_style: ResultKeyStyle,
    run_stamp: u64,
    pending: BTreeMap<(String, String), Vec<ResultRecord>>,
}

impl ResultAggregator {
    pub fn new(store: ResultStore, key_style: ResultKeyStyle, run_stamp: u64) -> Self {
        Self {
            store,
            key_style,
            run_stamp,
            pending: BTreeMap::new(),
        }
    }

    pub fn from_config(cfg: &MapsweepConfig) -> Self {
        let store = ResultStore::new(cfg.output_path(), DuplicatePolicy::from_config(cfg));
        Self::new(store, cfg.result_key, run_stamp_now())
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    pub fn query_key(&self, industry: &str) -> QueryKey {
        QueryKey::new(self.key_style, industry, self.run_stamp)
    }

    /// Hold `records` until their location is flushed.
    pub fn add(&mut self, industry: &str, location: &str, records: Vec<ResultRecord>) {
        let slot = self
            .pending
            .entry((industry.to_string(), location.to_string()))
            .or_default();
        *slot = accumulate(std::mem::take(slot), records);
    }

    /// Records accumulated and not yet persisted, across all locations.
    pub fn pending_records(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    pub fn pending_for(&self, industry: &str, location: &str) -> usize {
        self.pending
            .get(&(industry.to_string(), location.to_string()))
            .map_or(0, Vec::len)
    }

    /// Persist a location's pending records. Returns how many were
    /// written; 0 (and no file write) when nothing is pending.
    pub fn flush_location(&mut self, industry: &str, location: &str) -> Result<usize, PersistenceError> {
        let Some(records) = self
            .pending
            .remove(&(industry.to_string(), location.to_string()))
        else {
            return Ok(0);
        };
        let key = self.query_key(industry);
        self.store.persist(&key, records)
    }

    /// Persist everything pending, one write per query key. Keeps going
    /// after a failed key and returns the first error.
    pub fn flush_all(&mut self) -> Result<usize, PersistenceError> {
        let mut by_key: BTreeMap<QueryKey, Vec<ResultRecord>> = BTreeMap::new();
        for ((industry, _location), records) in std::mem::take(&mut self.pending) {
            let slot = by_key.entry(self.query_key(&industry)).or_default();
            *slot = accumulate(std::mem::take(slot), records);
        }

        let mut written = 0;
        let mut first_err = None;
        for (key, records) in by_key {
            match self.store.persist(&key, records) {
                Ok(n) => written += n,
                Err(e) => {
                    tracing::error!(key = %key, error = %e, "could not persist pending results");
                    first_err.get_or_insert(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(written),
        }
    }

    /// Drop anything still pending for `industry`. Returns the number of
    /// records discarded.
    pub fn reset_industry(&mut self, industry: &str) -> usize {
        let mut dropped = 0;
        self.pending.retain(|(i, _), records| {
            if i == industry {
                dropped += records.len();
                false
            } else {
                true
            }
        });
        dropped
    }
}
