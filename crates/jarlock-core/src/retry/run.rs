//! Retry loop: run a closure until success or policy says stop.

use std::time::Duration;

use super::classify;
use super::error::FetchError;
use super::policy::{RetryDecision, RetryPolicy};

/// Runs a closure until it succeeds or the retry policy says to stop.
/// On retryable failure, sleeps for the backoff duration then tries again.
/// Blocking; call from `spawn_blocking` if used from async code.
pub fn run_with_retry<T, F>(policy: &RetryPolicy, f: F) -> Result<T, FetchError>
where
    F: FnMut() -> Result<T, FetchError>,
{
    run_with_retry_using(policy, std::thread::sleep, f)
}

/// Like `run_with_retry` but with a caller-supplied sleep, so the backoff
/// sequence can be observed.
pub fn run_with_retry_using<T, F, S>(
    policy: &RetryPolicy,
    mut sleep: S,
    mut f: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Result<T, FetchError>,
    S: FnMut(Duration),
{
    let mut attempt = 1u32;
    loop {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) => {
                let kind = classify::classify(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        tracing::warn!("attempt {} failed: {}; retrying in {:?}", attempt, e, d);
                        sleep(d);
                        attempt += 1;
                    }
                }
            }
        }
    }
}
