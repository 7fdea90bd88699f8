//! Interrupt handling: `Running → ShuttingDown → Terminated`.

use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::mpsc;

/// Process exit code after an interrupt-triggered shutdown (128 + SIGINT).
pub const INTERRUPT_EXIT_CODE: i32 = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ShutdownState {
    Running = 0,
    ShuttingDown = 1,
    Terminated = 2,
}

impl ShutdownState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => ShutdownState::Running,
            1 => ShutdownState::ShuttingDown,
            _ => ShutdownState::Terminated,
        }
    }
}

#[derive(Debug)]
pub struct ShutdownCoordinator {
    state: AtomicU8,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(ShutdownState::Running as u8),
        }
    }

    pub fn state(&self) -> ShutdownState {
        ShutdownState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Enter `ShuttingDown`. Only the first call returns true; later
    /// interrupts are ignored.
    pub fn begin(&self) -> bool {
        let won = self
            .state
            .compare_exchange(
                ShutdownState::Running as u8,
                ShutdownState::ShuttingDown as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if won {
            tracing::info!("shutting down");
        } else {
            tracing::debug!("shutdown already in progress; interrupt ignored");
        }
        won
    }

    pub fn finish(&self) {
        self.state
            .store(ShutdownState::Terminated as u8, Ordering::Release);
        tracing::info!("shutdown complete");
    }
}

/// Forward every Ctrl-C to the returned channel. Installing the handler
/// replaces the default terminate-on-SIGINT behaviour for the process.
pub fn spawn_interrupt_listener() -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel(4);
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "could not listen for interrupts");
                break;
            }
            tracing::info!("interrupt received");
            match tx.try_send(()) {
                Ok(()) | Err(mpsc::error::TrySendError::Full(())) => {}
                Err(mpsc::error::TrySendError::Closed(())) => break,
            }
        }
    });
    rx
}
