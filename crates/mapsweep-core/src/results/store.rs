//! Result files: one JSON array per query key, rewritten atomically.

use std::path::{Path, PathBuf};

use super::key::QueryKey;
use super::policy::DuplicatePolicy;
use crate::error::PersistenceError;
use crate::storage;
use crate::worker::ResultRecord;

#[derive(Debug, Clone)]
pub struct ResultStore {
    dir: PathBuf,
    policy: DuplicatePolicy,
}

impl ResultStore {
    pub fn new(dir: impl Into<PathBuf>, policy: DuplicatePolicy) -> Self {
        Self {
            dir: dir.into(),
            policy,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &QueryKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Current durable content for `key`; empty if the file does not exist.
    pub fn read(&self, key: &QueryKey) -> Result<Vec<ResultRecord>, PersistenceError> {
        let path = self.path_for(key);
        match std::fs::read(&path) {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|source| PersistenceError::Parse { path, source })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(source) => Err(PersistenceError::Read { path, source }),
        }
    }

    /// Durable append: read prior content, merge `records` per the
    /// duplicate policy, atomically rewrite the whole file. Returns the
    /// number of records the file grew by. An empty `records` writes nothing.
    ///
    /// A corrupt existing file is an error rather than being overwritten.
    pub fn persist(&self, key: &QueryKey, records: Vec<ResultRecord>) -> Result<usize, PersistenceError> {
        if records.is_empty() {
            return Ok(0);
        }
        let existing = self.read(key)?;
        let before = existing.len();
        let merged = self.policy.merge(existing, records);
        let added = merged.len().saturating_sub(before);

        let path = self.path_for(key);
        let json = serde_json::to_vec_pretty(&merged).map_err(|source| PersistenceError::Encode {
            path: path.clone(),
            source,
        })?;
        storage::write_atomic(&path, &json).map_err(|source| PersistenceError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), records = added, total = merged.len(), "persisted results");
        Ok(added)
    }
}
