//! Deadline-bounded polling.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use super::session::DriverError;

/// Poll `probe` every `interval` until it yields a value or `timeout` passes.
///
/// `Ok(None)` means "not yet". An `Err` from the probe ends the wait
/// immediately; probes map the failures they want to ride out to `Ok(None)`.
pub async fn poll_until<T, F, Fut>(
    what: &str,
    timeout: Duration,
    interval: Duration,
    mut probe: F,
) -> Result<T, DriverError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, DriverError>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = probe().await? {
            return Ok(value);
        }
        if Instant::now() >= deadline {
            return Err(DriverError::Timeout(what.to_string()));
        }
        tokio::time::sleep(interval).await;
    }
}
