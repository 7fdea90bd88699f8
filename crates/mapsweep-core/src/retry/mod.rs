//! Retry and backoff policy.
//!
//! Starting a browser worker is the one step that is retried: a bounded
//! number of attempts with a fixed delay between them. Failures after the
//! worker is up are not retried here.

mod policy;
mod run;

pub use policy::{RetryDecision, RetryPolicy};
pub use run::{run_with_retry, RetryExhausted};
