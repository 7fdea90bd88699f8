//! How new records are merged into a result file's existing content.

use std::collections::HashSet;

use crate::config::{DuplicateMode, MapsweepConfig};
use crate::worker::ResultRecord;

/// Merge policy for one result file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Plain concatenation. Reruns may repeat entities.
    #[default]
    Append,
    /// Keep the first record for each natural key. Records with none of
    /// the key fields are always kept.
    Dedupe { key_fields: Vec<String> },
}

impl DuplicatePolicy {
    pub fn from_config(cfg: &MapsweepConfig) -> Self {
        match cfg.duplicates {
            DuplicateMode::Append => DuplicatePolicy::Append,
            DuplicateMode::Dedupe => DuplicatePolicy::Dedupe {
                key_fields: cfg.dedupe_key.clone(),
            },
        }
    }

    /// `existing` followed by whatever of `new` the policy admits.
    pub fn merge(&self, existing: Vec<ResultRecord>, new: Vec<ResultRecord>) -> Vec<ResultRecord> {
        match self {
            DuplicatePolicy::Append => super::accumulate(existing, new),
            DuplicatePolicy::Dedupe { key_fields } => {
                let mut seen = HashSet::new();
                let mut out = Vec::with_capacity(existing.len() + new.len());
                for record in existing.into_iter().chain(new) {
                    let first_seen = match natural_key(&record, key_fields) {
                        Some(key) => seen.insert(key),
                        None => true,
                    };
                    if first_seen {
                        out.push(record);
                    }
                }
                out
            }
        }
    }
}

/// JSON rendering of the key fields, or None when the record has none of them.
fn natural_key(record: &ResultRecord, key_fields: &[String]) -> Option<String> {
    let values: Vec<&serde_json::Value> = key_fields
        .iter()
        .map(|f| record.get(f).unwrap_or(&serde_json::Value::Null))
        .collect();
    if values.iter().all(|v| v.is_null()) {
        return None;
    }
    serde_json::to_string(&values).ok()
}
