//! Adaptive admission gate shared by all running jobs.
//!
//! A counting gate whose capacity (the concurrency limit) moves within
//! `[min, max]` as the resource monitor retunes it. Every job holds an
//! [`AdmissionSlot`] while it runs; dropping the slot releases it.
//!
//! Lowering the limit never preempts running jobs: it only takes effect as
//! slots are released, so `in_use` can briefly exceed `limit`. No slot is
//! ever granted while `in_use >= limit`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

#[derive(Debug)]
struct Gate {
    limit: usize,
    in_use: usize,
}

#[derive(Debug)]
pub struct AdmissionController {
    min: usize,
    max: usize,
    gate: Mutex<Gate>,
    freed: Notify,
}

impl AdmissionController {
    /// Gate with bounds `[min, max]` (min floored at 1) starting at `initial`
    /// clamped into them.
    pub fn new(min: usize, max: usize, initial: usize) -> Self {
        let min = min.max(1);
        let max = max.max(min);
        Self {
            min,
            max,
            gate: Mutex::new(Gate {
                limit: initial.clamp(min, max),
                in_use: 0,
            }),
            freed: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Gate> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn bounds(&self) -> (usize, usize) {
        (self.min, self.max)
    }

    /// Current concurrency limit.
    pub fn limit(&self) -> usize {
        self.lock().limit
    }

    /// Slots currently held.
    pub fn in_use(&self) -> usize {
        self.lock().in_use
    }

    /// Take a slot if one is free under the current limit.
    pub fn try_acquire(self: &Arc<Self>) -> Option<AdmissionSlot> {
        let mut gate = self.lock();
        if gate.in_use >= gate.limit {
            return None;
        }
        gate.in_use += 1;
        Some(AdmissionSlot {
            controller: Arc::clone(self),
        })
    }

    /// Wait until a slot is free and take it. Cancel-safe: dropping the
    /// future before it completes holds nothing.
    pub async fn acquire(self: &Arc<Self>) -> AdmissionSlot {
        loop {
            let freed = self.freed.notified();
            tokio::pin!(freed);
            // Register before checking so a release in between is not missed.
            freed.as_mut().enable();
            if let Some(slot) = self.try_acquire() {
                return slot;
            }
            freed.await;
        }
    }

    /// Move the limit by `delta`, clamped to `[min, max]`, atomically with
    /// respect to acquire and release. Returns the new limit.
    pub fn adjust(&self, delta: isize) -> usize {
        let (old, new) = {
            let mut gate = self.lock();
            let old = gate.limit;
            let target = if delta >= 0 {
                old.saturating_add(delta.unsigned_abs())
            } else {
                old.saturating_sub(delta.unsigned_abs())
            };
            gate.limit = target.clamp(self.min, self.max);
            (old, gate.limit)
        };
        if new > old {
            self.freed.notify_waiters();
        }
        if new != old {
            tracing::debug!(from = old, to = new, "concurrency limit adjusted");
        }
        new
    }

    fn release(&self) {
        {
            let mut gate = self.lock();
            gate.in_use = gate.in_use.saturating_sub(1);
        }
        self.freed.notify_waiters();
    }
}

/// One admitted job. Released on drop, on every exit path.
#[derive(Debug)]
pub struct AdmissionSlot {
    controller: Arc<AdmissionController>,
}

impl Drop for AdmissionSlot {
    fn drop(&mut self) {
        self.controller.release();
    }
}
