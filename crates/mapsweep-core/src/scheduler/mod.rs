//! Batch scheduler.
//!
//! Drives every `industry × location` pair through partitioning, adaptive
//! admission, job execution, result persistence and checkpointing, and
//! handles the interrupt-triggered shutdown.

mod admission;
mod batch;
mod pending;
mod report;
mod shutdown;

pub use admission::{AdmissionController, AdmissionSlot};
pub use batch::BatchOrchestrator;
pub use pending::{LocationOutcome, LocationTracker};
pub use report::BatchReport;
pub use shutdown::{spawn_interrupt_listener, ShutdownCoordinator, ShutdownState, INTERRUPT_EXIT_CODE};
