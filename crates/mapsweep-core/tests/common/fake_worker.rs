//! In-memory worker and telemetry doubles for batch tests.
//!
//! `FakeWorker` decides per session what to do from the `SessionSpec`
//! (location and start angle), records every spec it was opened with, and
//! tracks how many sessions run at once.

use async_trait::async_trait;
use mapsweep_core::error::{SessionError, WorkerInitError};
use mapsweep_core::monitor::{Reading, Telemetry};
use mapsweep_core::worker::{ResultRecord, Session, SessionFactory, SessionSpec};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// What one session does.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    /// Return this many records.
    Records(usize),
    /// Fail to start, every attempt.
    FailInit,
    /// Start, then report a worker error.
    SessionError,
    /// Start and never finish.
    Hang,
    /// Panic the first time any session gets this behavior; afterwards
    /// return this many records.
    PanicOnce(usize),
}

type Script = dyn Fn(&SessionSpec) -> Behavior + Send + Sync;

#[derive(Default)]
pub struct WorkerStats {
    specs: Mutex<Vec<SessionSpec>>,
    opens: AtomicUsize,
    closes: AtomicUsize,
    dropped: AtomicUsize,
    running: AtomicUsize,
    peak: AtomicUsize,
}

pub struct FakeWorker {
    script: Box<Script>,
    delay: Duration,
    panicked: AtomicBool,
    stats: Arc<WorkerStats>,
}

impl FakeWorker {
    pub fn new(script: impl Fn(&SessionSpec) -> Behavior + Send + Sync + 'static) -> Arc<Self> {
        Self::with_delay(script, Duration::ZERO)
    }

    /// Each collecting session sleeps `delay` before returning.
    pub fn with_delay(
        script: impl Fn(&SessionSpec) -> Behavior + Send + Sync + 'static,
        delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            delay,
            panicked: AtomicBool::new(false),
            stats: Arc::new(WorkerStats::default()),
        })
    }

    pub fn always(records: usize) -> Arc<Self> {
        Self::new(move |_| Behavior::Records(records))
    }

    /// Specs of every successfully opened session, in open order.
    pub fn specs(&self) -> Vec<SessionSpec> {
        self.stats.specs.lock().unwrap().clone()
    }

    /// Open attempts, including failed ones.
    pub fn opens(&self) -> usize {
        self.stats.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.stats.closes.load(Ordering::SeqCst)
    }

    /// Sessions released, by close or by being dropped mid-job.
    pub fn dropped(&self) -> usize {
        self.stats.dropped.load(Ordering::SeqCst)
    }

    /// Most sessions alive at the same time.
    pub fn peak(&self) -> usize {
        self.stats.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionFactory for FakeWorker {
    async fn open(&self, spec: &SessionSpec) -> Result<Box<dyn Session>, WorkerInitError> {
        self.stats.opens.fetch_add(1, Ordering::SeqCst);
        let behavior = match (self.script)(spec) {
            Behavior::FailInit => return Err(WorkerInitError::new("browser did not start")),
            Behavior::PanicOnce(n) => {
                if !self.panicked.swap(true, Ordering::SeqCst) {
                    panic!("worker pool crashed");
                }
                Behavior::Records(n)
            }
            other => other,
        };
        self.stats.specs.lock().unwrap().push(spec.clone());
        let now = self.stats.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak.fetch_max(now, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            stats: Arc::clone(&self.stats),
            delay: self.delay,
            behavior,
            tag: format!(
                "{}@{:.3}",
                spec.location.as_deref().unwrap_or_default(),
                spec.start_angle.unwrap_or(0.0)
            ),
        }))
    }
}

struct FakeSession {
    stats: Arc<WorkerStats>,
    delay: Duration,
    behavior: Behavior,
    tag: String,
}

#[async_trait]
impl Session for FakeSession {
    async fn collect(&mut self) -> Result<Vec<ResultRecord>, SessionError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.behavior {
            Behavior::Records(n) => Ok(records(&self.tag, n)),
            Behavior::SessionError => Err(SessionError::Worker("results page blocked".into())),
            Behavior::Hang => {
                std::future::pending::<()>().await;
                Ok(Vec::new())
            }
            Behavior::FailInit | Behavior::PanicOnce(_) => unreachable!("resolved at open"),
        }
    }

    async fn close(&mut self) {
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        self.stats.running.fetch_sub(1, Ordering::SeqCst);
        self.stats.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn records(tag: &str, n: usize) -> Vec<ResultRecord> {
    (0..n)
        .map(|i| {
            let mut r = ResultRecord::new();
            r.insert("Name".into(), format!("{} #{}", tag, i).into());
            r.insert("Address".into(), format!("{} Main St", i).into());
            r
        })
        .collect()
}

/// Fixed reading; optionally signals every sample on a channel.
pub struct FakeTelemetry {
    reading: Reading,
    sampled: Option<mpsc::UnboundedSender<()>>,
}

impl FakeTelemetry {
    pub fn calm() -> Self {
        Self {
            reading: Reading {
                cpu_pct: 20.0,
                ram_bytes: 1_000_000_000,
            },
            sampled: None,
        }
    }

    pub fn hot() -> Self {
        Self {
            reading: Reading {
                cpu_pct: 99.0,
                ram_bytes: 1_000_000_000,
            },
            sampled: None,
        }
    }

    /// Calm telemetry plus a receiver that yields once per sample, i.e.
    /// once per finished job.
    pub fn signalling() -> (Self, mpsc::UnboundedReceiver<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut t = Self::calm();
        t.sampled = Some(tx);
        (t, rx)
    }
}

impl Telemetry for FakeTelemetry {
    fn sample(&mut self) -> Reading {
        if let Some(tx) = &self.sampled {
            let _ = tx.send(());
        }
        self.reading
    }
}
