//! Sidecar record of builds upstream reported as failed.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// version → build ids whose build info carried the failure marker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RejectionLedger {
    pub(super) versions: BTreeMap<String, BTreeSet<String>>,
}

impl RejectionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, version: &str, build: &str) -> bool {
        self.versions
            .get(version)
            .is_some_and(|builds| builds.contains(build))
    }

    /// Record a rejection. Returns `false` if it was already known.
    pub fn insert(&mut self, version: &str, build: &str) -> bool {
        self.versions
            .entry(version.to_string())
            .or_default()
            .insert(build.to_string())
    }

    pub fn len(&self) -> usize {
        self.versions.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ledger path next to a lock file: `lock.json` → `lock.rejected.json`.
pub fn rejections_path(lock_path: &Path) -> PathBuf {
    let stem = lock_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "lock".to_string());
    lock_path.with_file_name(format!("{}.rejected.json", stem))
}
