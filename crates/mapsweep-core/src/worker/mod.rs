//! Seam to the external browser-automation worker.
//!
//! The orchestrator never scrapes anything itself. For every job it opens a
//! [`Session`] through a [`SessionFactory`], lets it collect entity records
//! until it runs out of results, and closes it. [`CommandSessionFactory`]
//! runs each session as a separate OS process.

mod command;
mod protocol;

pub use command::CommandSessionFactory;
pub use protocol::WorkerMessage;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{SessionError, WorkerInitError};
use crate::job::Job;

/// One scraped entity: named fields to values. Opaque to the orchestrator.
pub type ResultRecord = serde_json::Map<String, serde_json::Value>;

/// Everything a worker needs to run one job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSpec {
    pub headless: bool,
    pub lat_center: Option<f64>,
    pub long_center: Option<f64>,
    pub start_angle: Option<f64>,
    pub end_angle: Option<f64>,
    pub location: Option<String>,
    pub search_query: String,
}

impl SessionSpec {
    pub fn for_job(job: &Job, headless: bool) -> Self {
        let region = job.region();
        Self {
            headless,
            lat_center: region.map(|r| r.lat_center),
            long_center: region.map(|r| r.long_center),
            start_angle: region.map(|r| r.start_angle),
            end_angle: region.map(|r| r.end_angle),
            location: Some(job.location().to_string()),
            search_query: job.industry().to_string(),
        }
    }

    /// Maps search URL for this session: centred on the subregion when
    /// coordinates are set, otherwise a "<query> in <location>" search.
    pub fn search_url(&self) -> String {
        let query = plus_joined(&self.search_query);
        match (self.lat_center, self.long_center) {
            (Some(lat), Some(long)) => {
                format!("https://www.google.com/maps/search/{}/@{},{},14z", query, lat, long)
            }
            _ => {
                let location = plus_joined(self.location.as_deref().unwrap_or_default());
                format!("https://www.google.com/maps/search/{}+in+{}/", query, location)
            }
        }
    }
}

fn plus_joined(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join("+")
}

/// Starts worker sessions. Shared by all concurrently running jobs.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, spec: &SessionSpec) -> Result<Box<dyn Session>, WorkerInitError>;
}

/// A running worker bound to one job.
///
/// Dropping a session must also release the worker; the batch driver
/// cancels in-flight jobs by dropping them.
#[async_trait]
pub trait Session: Send {
    /// Drive navigation/scroll/collect until the worker has no more results.
    async fn collect(&mut self) -> Result<Vec<ResultRecord>, SessionError>;

    /// Release the worker. Called on every exit path after a successful open.
    async fn close(&mut self);
}
