//! Remote catalog clients.
//!
//! A `Catalog` enumerates the builds an upstream currently exposes and turns
//! each listing into a downloadable candidate. Two policies exist:
//! - latest-only: one call lists every version with its newest build and URL
//! - full history: versions, then builds per version, then a build-info
//!   lookup per build that may reject it
//!
//! Listing calls that exhaust their retry budget contribute nothing; they
//! never fail the run.

mod history;
mod latest;

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use url::Url;

use crate::config::{SourceConfig, SourcePolicy};
use crate::http::HttpClient;
use crate::retry::{run_with_retry, FetchError, RetryPolicy};

pub use history::{BuildInfo, HistoryCatalog};
pub use latest::LatestOnlyCatalog;

/// A build seen upstream. `download_url` is known up front for latest-only
/// sources and only after resolution for full-history ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub version: String,
    pub build: String,
    pub download_url: Option<String>,
}

/// A build ready to be hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCandidate {
    pub version: String,
    pub build: String,
    pub download_url: String,
}

/// Outcome of resolving a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Ready(BuildCandidate),
    /// Upstream marked the build as failed. Permanent.
    Rejected,
    /// Resolution could not be completed this run (network). Eligible next run.
    Unavailable,
}

/// Capability interface over upstream build sources.
///
/// Methods block on network I/O; the orchestrator runs them on the blocking pool.
pub trait Catalog: Send + Sync {
    /// Every (version, build) the upstream currently exposes.
    fn list_candidates(&self) -> Vec<Listing>;

    /// Turn a listing into a candidate, or say why not.
    fn resolve(&self, listing: &Listing) -> Resolution;
}

/// Build the catalog for a configured source.
pub fn catalog_for(
    source: &SourceConfig,
    http: HttpClient,
    retry: RetryPolicy,
) -> Result<Arc<dyn Catalog>> {
    let catalog: Arc<dyn Catalog> = match source.policy {
        SourcePolicy::Latest => Arc::new(
            LatestOnlyCatalog::new(&source.endpoint, http, retry)
                .with_context(|| format!("source {}", source.name))?,
        ),
        SourcePolicy::History => Arc::new(
            HistoryCatalog::new(&source.endpoint, http, retry)
                .with_context(|| format!("source {}", source.name))?,
        ),
    };
    Ok(catalog)
}

pub(crate) fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint).with_context(|| format!("invalid endpoint {}", endpoint))?;
    if url.cannot_be_a_base() {
        anyhow::bail!("endpoint {} cannot have path segments appended", endpoint);
    }
    Ok(url)
}

/// `base` with `segments` appended as percent-encoded path segments.
pub(crate) fn join_segments(base: &Url, segments: &[&str]) -> String {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url.into()
}

/// GET JSON with retries, treating a body `extract` cannot read as malformed
/// (and therefore retryable). Returns `None` when the budget is exhausted.
pub(crate) fn fetch_json_with<T, F>(
    http: &HttpClient,
    retry: &RetryPolicy,
    url: &str,
    extract: F,
) -> Option<T>
where
    F: Fn(&Value) -> Option<T>,
{
    let result = run_with_retry(retry, || {
        let body = http.get_json(url)?;
        extract(&body).ok_or_else(|| FetchError::Malformed(format!("unexpected shape from {}", url)))
    });
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("giving up on {}: {}", url, e);
            None
        }
    }
}
