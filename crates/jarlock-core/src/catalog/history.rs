//! Full-history source: versions, every build per version, and a build-info
//! lookup that validates a build before it is hashed.
//!
//! Endpoints (relative to the configured base):
//! - `/` → `{"versions": [...]}`
//! - `/{version}` → `{"builds": {"all": [...]}}`
//! - `/{version}/{build}` → `{"result": "SUCCESS" | "FAILURE", ...}`
//! - `/{version}/{build}/download` → artifact

use anyhow::Result;
use serde_json::Value;
use url::Url;

use crate::http::{id_string, HttpClient};
use crate::retry::RetryPolicy;

use super::{
    fetch_json_with, join_segments, parse_endpoint, BuildCandidate, Catalog, Listing, Resolution,
};

const FAILURE_MARKER: &str = "FAILURE";

/// Per-build metadata used only to decide whether a build is usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub result: Option<String>,
}

impl BuildInfo {
    pub fn is_valid(&self) -> bool {
        self.result.as_deref() != Some(FAILURE_MARKER)
    }
}

#[derive(Debug, Clone)]
pub struct HistoryCatalog {
    endpoint: Url,
    http: HttpClient,
    retry: RetryPolicy,
}

impl HistoryCatalog {
    pub fn new(endpoint: &str, http: HttpClient, retry: RetryPolicy) -> Result<Self> {
        Ok(Self {
            endpoint: parse_endpoint(endpoint)?,
            http,
            retry,
        })
    }

    pub fn list_versions(&self) -> Vec<String> {
        tracing::info!("fetching versions from {}", self.endpoint);
        fetch_json_with(&self.http, &self.retry, self.endpoint.as_str(), parse_versions)
            .unwrap_or_default()
    }

    pub fn list_builds(&self, version: &str) -> Vec<String> {
        tracing::debug!("fetching builds for {}", version);
        let url = join_segments(&self.endpoint, &[version]);
        fetch_json_with(&self.http, &self.retry, &url, parse_builds).unwrap_or_default()
    }

    /// `None` when the info call failed after retries.
    pub fn build_info(&self, version: &str, build: &str) -> Option<BuildInfo> {
        tracing::debug!("fetching build info for {} / {}", version, build);
        let url = join_segments(&self.endpoint, &[version, build]);
        fetch_json_with(&self.http, &self.retry, &url, parse_build_info)
    }

    pub fn download_url(&self, version: &str, build: &str) -> String {
        join_segments(&self.endpoint, &[version, build, "download"])
    }
}

impl Catalog for HistoryCatalog {
    fn list_candidates(&self) -> Vec<Listing> {
        let versions = self.list_versions();
        tracing::info!("found {} versions", versions.len());
        let mut out = Vec::new();
        for version in versions {
            for build in self.list_builds(&version) {
                out.push(Listing {
                    version: version.clone(),
                    build,
                    download_url: None,
                });
            }
        }
        out
    }

    fn resolve(&self, listing: &Listing) -> Resolution {
        match self.build_info(&listing.version, &listing.build) {
            None => Resolution::Unavailable,
            Some(info) if !info.is_valid() => Resolution::Rejected,
            Some(_) => Resolution::Ready(BuildCandidate {
                version: listing.version.clone(),
                build: listing.build.clone(),
                download_url: self.download_url(&listing.version, &listing.build),
            }),
        }
    }
}

pub(super) fn parse_versions(body: &Value) -> Option<Vec<String>> {
    body.get("versions")?
        .as_array()?
        .iter()
        .map(id_string)
        .collect()
}

pub(super) fn parse_builds(body: &Value) -> Option<Vec<String>> {
    body.get("builds")?
        .get("all")?
        .as_array()?
        .iter()
        .map(id_string)
        .collect()
}

pub(super) fn parse_build_info(body: &Value) -> Option<BuildInfo> {
    let obj = body.as_object()?;
    Some(BuildInfo {
        result: obj.get("result").and_then(Value::as_str).map(str::to_string),
    })
}
