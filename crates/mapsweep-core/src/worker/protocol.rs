//! Line protocol spoken by worker processes on stdout.
//!
//! One JSON object per line: `ready` first, then any number of `record`
//! lines, then `done` (or end of output). `error` aborts the session.

use serde::{Deserialize, Serialize};

use super::ResultRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum WorkerMessage {
    Ready,
    Record { fields: ResultRecord },
    Done,
    Error { message: String },
}

impl WorkerMessage {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}
