//! Hashing fetcher: stream an artifact and compute its SHA-256.
//!
//! The body is never held in memory; each chunk goes straight into the
//! digest. A failed attempt throws its partial digest away and the retry
//! starts from byte zero.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::http::HttpClient;
use crate::retry::{run_with_retry_using, RetryPolicy};

type SleepFn = Arc<dyn Fn(Duration) + Send + Sync>;

/// Computes content hashes for artifact URLs.
///
/// Blocking; the orchestrator calls it from the blocking pool.
pub trait ArtifactHasher: Send + Sync {
    /// Lowercase hex SHA-256 of the body at `url`, or `None` once the retry
    /// budget is exhausted.
    fn sha256(&self, url: &str) -> Option<String>;
}

/// `ArtifactHasher` backed by libcurl with the shared retry policy.
#[derive(Clone)]
pub struct CurlHasher {
    http: HttpClient,
    retry: RetryPolicy,
    sleep: SleepFn,
}

impl CurlHasher {
    pub fn new(http: HttpClient, retry: RetryPolicy) -> Self {
        Self::with_sleep(http, retry, std::thread::sleep)
    }

    /// Like `new`, but backoff waits go through `sleep` instead of
    /// `std::thread::sleep`.
    pub fn with_sleep<S>(http: HttpClient, retry: RetryPolicy, sleep: S) -> Self
    where
        S: Fn(Duration) + Send + Sync + 'static,
    {
        Self {
            http,
            retry,
            sleep: Arc::new(sleep),
        }
    }
}

impl fmt::Debug for CurlHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurlHasher")
            .field("http", &self.http)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ArtifactHasher for CurlHasher {
    fn sha256(&self, url: &str) -> Option<String> {
        tracing::debug!("hashing {}", url);
        let result = run_with_retry_using(&self.retry, |d| (self.sleep)(d), || {
            let mut hasher = Sha256::new();
            let bytes = self.http.get_streaming(url, |chunk| hasher.update(chunk))?;
            Ok((hex::encode(hasher.finalize()), bytes))
        });
        match result {
            Ok((digest, bytes)) => {
                tracing::debug!("{} -> {} ({} bytes)", url, digest, bytes);
                Some(digest)
            }
            Err(e) => {
                tracing::warn!("giving up hashing {}: {}", url, e);
                None
            }
        }
    }
}
