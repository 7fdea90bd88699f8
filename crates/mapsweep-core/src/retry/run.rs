//! Retry loop: run an async operation until success or policy says stop.

use std::fmt::Display;
use std::future::Future;

use super::policy::{RetryDecision, RetryPolicy};

/// Last error of an operation that failed on every allowed attempt.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Runs `f` until it succeeds or the retry policy says to stop.
/// On failure, sleeps for the backoff duration then tries again.
pub async fn run_with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    mut f: F,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 1u32;
    loop {
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) => match policy.decide(attempt) {
                RetryDecision::NoRetry => {
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: e,
                    })
                }
                RetryDecision::RetryAfter(d) => {
                    tracing::warn!(attempt, max = policy.max_attempts, error = %e, "attempt failed, retrying in {:?}", d);
                    tokio::time::sleep(d).await;
                    attempt += 1;
                }
            },
        }
    }
}
