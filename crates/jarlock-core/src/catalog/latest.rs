//! Latest-only source: a single listing call returns, per version, just the
//! newest build and its download URL.
//!
//! Expected shape:
//! `{"builds": {"<version>": {"latest": {"name": <id>, "zipUrl": "<url>"}}}}`

use anyhow::Result;
use serde_json::Value;
use url::Url;

use crate::http::{id_string, HttpClient};
use crate::retry::RetryPolicy;

use super::{fetch_json_with, parse_endpoint, BuildCandidate, Catalog, Listing, Resolution};

#[derive(Debug, Clone)]
pub struct LatestOnlyCatalog {
    endpoint: Url,
    http: HttpClient,
    retry: RetryPolicy,
}

impl LatestOnlyCatalog {
    pub fn new(endpoint: &str, http: HttpClient, retry: RetryPolicy) -> Result<Self> {
        Ok(Self {
            endpoint: parse_endpoint(endpoint)?,
            http,
            retry,
        })
    }
}

impl Catalog for LatestOnlyCatalog {
    fn list_candidates(&self) -> Vec<Listing> {
        tracing::info!("fetching versions and latest builds from {}", self.endpoint);
        fetch_json_with(&self.http, &self.retry, self.endpoint.as_str(), parse_latest)
            .unwrap_or_default()
    }

    fn resolve(&self, listing: &Listing) -> Resolution {
        match &listing.download_url {
            Some(url) => Resolution::Ready(BuildCandidate {
                version: listing.version.clone(),
                build: listing.build.clone(),
                download_url: url.clone(),
            }),
            None => Resolution::Unavailable,
        }
    }
}

/// `None` if the document is not a `builds` object at all. Versions whose
/// `latest` entry lacks a name or URL are skipped.
pub(super) fn parse_latest(body: &Value) -> Option<Vec<Listing>> {
    let builds = body.get("builds")?.as_object()?;
    let mut out = Vec::with_capacity(builds.len());
    for (version, info) in builds {
        let latest = info.get("latest");
        let name = latest.and_then(|l| l.get("name")).and_then(id_string);
        let url = latest
            .and_then(|l| l.get("zipUrl"))
            .and_then(Value::as_str);
        match (name, url) {
            (Some(build), Some(url)) => out.push(Listing {
                version: version.clone(),
                build,
                download_url: Some(url.to_string()),
            }),
            _ => tracing::debug!("version {} has no usable latest build", version),
        }
    }
    Some(out)
}
