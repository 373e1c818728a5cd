//! Bounded retry for session operations.

use std::fmt::Display;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::config::Timing;

/// Attempt budget and fixed backoff between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self { attempts, backoff }
    }

    pub fn from_timing(timing: &Timing) -> Self {
        Self::new(timing.max_retries, timing.retry_backoff())
    }
}

/// Run `op` against `target` until it succeeds, fails with an error
/// `is_retryable` rejects, or the attempt budget runs out.
///
/// The target is lent to each attempt so the operation can borrow it
/// mutably; the last error is returned when attempts are exhausted.
pub async fn retry<S, T, E, F, C>(
    policy: RetryPolicy,
    what: &str,
    target: &mut S,
    mut op: F,
    is_retryable: C,
) -> Result<T, E>
where
    S: ?Sized,
    E: Display,
    F: for<'a> FnMut(&'a mut S) -> BoxFuture<'a, Result<T, E>>,
    C: Fn(&E) -> bool,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(target).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}/{}", what, attempt, attempts);
                }
                return Ok(value);
            }
            Err(e) if !is_retryable(&e) => return Err(e),
            Err(e) if attempt >= attempts => {
                warn!("{} failed after {} attempts: {}", what, attempts, e);
                return Err(e);
            }
            Err(e) => {
                debug!(
                    "{} failed (attempt {}/{}), retrying in {:?}: {}",
                    what, attempt, attempts, policy.backoff, e
                );
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
        }
    }
}
