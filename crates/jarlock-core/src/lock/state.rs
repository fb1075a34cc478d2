//! In-memory lock state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One verified build artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    pub url: String,
    /// Lowercase hex SHA-256 of the artifact bytes.
    pub sha256: String,
}

/// version → build → entry. Sorted maps keep the persisted file stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockState {
    pub(super) versions: BTreeMap<String, BTreeMap<String, LockEntry>>,
}

impl LockState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff `state[version][build]` exists.
    pub fn contains(&self, version: &str, build: &str) -> bool {
        self.versions
            .get(version)
            .is_some_and(|builds| builds.contains_key(build))
    }

    pub fn get(&self, version: &str, build: &str) -> Option<&LockEntry> {
        self.versions.get(version)?.get(build)
    }

    /// Insert an entry, creating the version map if needed.
    ///
    /// Entries are immutable once written: an existing `(version, build)` is
    /// left untouched and `false` is returned.
    pub fn merge(&mut self, version: &str, build: &str, entry: LockEntry) -> bool {
        let builds = self.versions.entry(version.to_string()).or_default();
        if builds.contains_key(build) {
            return false;
        }
        builds.insert(build.to_string(), entry);
        true
    }

    /// Iterate versions and their builds in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, LockEntry>)> {
        self.versions.iter().map(|(v, b)| (v.as_str(), b))
    }

    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    pub fn entry_count(&self) -> usize {
        self.versions.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count() == 0
    }
}
