//! Orchestrator tests against in-memory catalogs and hashers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::tempdir;

use super::*;
use crate::catalog::{BuildCandidate, Listing, Resolution};
use crate::lock::LockError;

fn digest_of(url: &str) -> String {
    crate::checksum::sha256_reader(url.as_bytes()).unwrap()
}

/// Catalog serving a fixed listing; builds in `rejected` resolve as rejected,
/// builds in `unavailable` as unavailable.
#[derive(Default)]
struct FakeCatalog {
    listings: Vec<Listing>,
    rejected: Vec<(String, String)>,
    unavailable: Vec<(String, String)>,
    resolve_calls: Mutex<HashMap<(String, String), usize>>,
}

impl FakeCatalog {
    fn with_builds(pairs: &[(&str, &str)]) -> Self {
        Self {
            listings: pairs
                .iter()
                .map(|(v, b)| Listing {
                    version: v.to_string(),
                    build: b.to_string(),
                    download_url: None,
                })
                .collect(),
            ..Self::default()
        }
    }

    fn resolve_count(&self, version: &str, build: &str) -> usize {
        let calls = self.resolve_calls.lock().unwrap();
        calls
            .get(&(version.to_string(), build.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

impl Catalog for FakeCatalog {
    fn list_candidates(&self) -> Vec<Listing> {
        self.listings.clone()
    }

    fn resolve(&self, listing: &Listing) -> Resolution {
        let key = (listing.version.clone(), listing.build.clone());
        *self.resolve_calls.lock().unwrap().entry(key.clone()).or_default() += 1;
        if self.rejected.contains(&key) {
            return Resolution::Rejected;
        }
        if self.unavailable.contains(&key) {
            return Resolution::Unavailable;
        }
        Resolution::Ready(BuildCandidate {
            download_url: format!("https://cdn.test/{}/{}", listing.version, listing.build),
            version: key.0,
            build: key.1,
        })
    }
}

/// Hasher that digests the URL text, tracks in-flight calls, and can be told to fail.
#[derive(Default)]
struct FakeHasher {
    urls: Mutex<Vec<String>>,
    failing: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Duration,
}

impl FakeHasher {
    fn hashed(&self) -> Vec<String> {
        let mut urls = self.urls.lock().unwrap().clone();
        urls.sort();
        urls
    }
}

impl ArtifactHasher for FakeHasher {
    fn sha256(&self, url: &str) -> Option<String> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.urls.lock().unwrap().push(url.to_string());
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().iter().any(|u| u == url) {
            return None;
        }
        Some(digest_of(url))
    }
}

async fn run(
    lock_path: &Path,
    catalog: &Arc<FakeCatalog>,
    hasher: &Arc<FakeHasher>,
    opts: &UpdateOptions,
) -> Result<UpdateReport> {
    update_lock(
        lock_path,
        Arc::clone(catalog) as Arc<dyn Catalog>,
        Arc::clone(hasher) as Arc<dyn ArtifactHasher>,
        opts,
        None,
    )
    .await
}

#[tokio::test]
async fn second_run_is_idempotent_and_hashes_nothing() {
    let dir = tempdir().unwrap();
    let lock = dir.path().join("lock.json");
    let catalog = Arc::new(FakeCatalog::with_builds(&[("1.20", "5"), ("1.21", "1")]));
    let hasher = Arc::new(FakeHasher::default());
    let opts = UpdateOptions::default();

    let first = run(&lock, &catalog, &hasher, &opts).await.unwrap();
    assert_eq!(first.added, 2);
    let bytes_after_first = std::fs::read(&lock).unwrap();

    let second = run(&lock, &catalog, &hasher, &opts).await.unwrap();
    assert_eq!(second.added, 0);
    assert_eq!(second.skipped_known, 2);
    assert_eq!(std::fs::read(&lock).unwrap(), bytes_after_first);
    assert_eq!(hasher.hashed().len(), 2, "no hashing on the second run");
}

#[tokio::test]
async fn locked_pairs_are_never_hashed() {
    let dir = tempdir().unwrap();
    let lock = dir.path().join("lock.json");
    let mut state = LockState::new();
    state.merge(
        "1.20",
        "5",
        crate::lock::LockEntry {
            url: "https://old.test/5".to_string(),
            sha256: "a".repeat(64),
        },
    );
    state.save_to_path(&lock).unwrap();

    let catalog = Arc::new(FakeCatalog::with_builds(&[("1.20", "5"), ("1.20", "6")]));
    let hasher = Arc::new(FakeHasher::default());
    let report = run(&lock, &catalog, &hasher, &UpdateOptions::default())
        .await
        .unwrap();

    assert_eq!(report.added, 1);
    assert_eq!(hasher.hashed(), vec!["https://cdn.test/1.20/6".to_string()]);
    assert_eq!(catalog.resolve_count("1.20", "5"), 0);
    let loaded = LockState::load_from_path(&lock).unwrap();
    assert_eq!(loaded.get("1.20", "5").unwrap().url, "https://old.test/5");
    assert_eq!(
        loaded.get("1.20", "6").unwrap().sha256,
        digest_of("https://cdn.test/1.20/6")
    );
}

#[tokio::test]
async fn concurrency_cap_is_respected() {
    let dir = tempdir().unwrap();
    let lock = dir.path().join("lock.json");
    let builds: Vec<(String, String)> = (0..24).map(|i| ("v".to_string(), i.to_string())).collect();
    let pairs: Vec<(&str, &str)> = builds.iter().map(|(v, b)| (v.as_str(), b.as_str())).collect();
    let catalog = Arc::new(FakeCatalog::with_builds(&pairs));
    let hasher = Arc::new(FakeHasher {
        delay: Duration::from_millis(20),
        ..FakeHasher::default()
    });
    let opts = UpdateOptions {
        max_concurrent: 3,
        ..UpdateOptions::default()
    };

    let report = run(&lock, &catalog, &hasher, &opts).await.unwrap();
    assert_eq!(report.added, 24);
    let max_seen = hasher.max_in_flight.load(Ordering::SeqCst);
    assert_eq!(max_seen, 3, "saw {} hashes in flight", max_seen);
}

#[tokio::test]
async fn rejected_build_is_remembered_and_not_resolved_again() {
    let dir = tempdir().unwrap();
    let lock = dir.path().join("lock.json");
    let catalog = Arc::new(FakeCatalog {
        rejected: vec![("v1".to_string(), "11".to_string())],
        ..FakeCatalog::with_builds(&[("v1", "10"), ("v1", "11")])
    });
    let hasher = Arc::new(FakeHasher::default());
    let opts = UpdateOptions::default();

    let first = run(&lock, &catalog, &hasher, &opts).await.unwrap();
    assert_eq!(first.added, 1);
    assert_eq!(first.rejected, 1);
    let state = LockState::load_from_path(&lock).unwrap();
    assert!(state.contains("v1", "10"));
    assert!(!state.contains("v1", "11"));

    let second = run(&lock, &catalog, &hasher, &opts).await.unwrap();
    assert_eq!(second.added, 0);
    assert_eq!(second.skipped_rejected, 1);
    assert_eq!(catalog.resolve_count("v1", "11"), 1);
    assert!(rejections_path(&lock).exists());
}

#[tokio::test]
async fn rejections_rechecked_when_not_remembered() {
    let dir = tempdir().unwrap();
    let lock = dir.path().join("lock.json");
    let catalog = Arc::new(FakeCatalog {
        rejected: vec![("v1".to_string(), "11".to_string())],
        ..FakeCatalog::with_builds(&[("v1", "11")])
    });
    let hasher = Arc::new(FakeHasher::default());
    let opts = UpdateOptions {
        remember_rejections: false,
        ..UpdateOptions::default()
    };

    run(&lock, &catalog, &hasher, &opts).await.unwrap();
    let second = run(&lock, &catalog, &hasher, &opts).await.unwrap();
    assert_eq!(second.rejected, 1);
    assert_eq!(catalog.resolve_count("v1", "11"), 2);
    assert!(!rejections_path(&lock).exists());
    assert!(LockState::load_from_path(&lock).unwrap().is_empty());
}

#[tokio::test]
async fn transient_failures_are_dropped_and_retried_next_run() {
    let dir = tempdir().unwrap();
    let lock = dir.path().join("lock.json");
    let catalog = Arc::new(FakeCatalog {
        unavailable: vec![("v1".to_string(), "3".to_string())],
        ..FakeCatalog::with_builds(&[("v1", "1"), ("v1", "2"), ("v1", "3")])
    });
    let hasher = Arc::new(FakeHasher::default());
    hasher
        .failing
        .lock()
        .unwrap()
        .push("https://cdn.test/v1/2".to_string());
    let opts = UpdateOptions::default();

    let first = run(&lock, &catalog, &hasher, &opts).await.unwrap();
    assert_eq!(first.added, 1);
    assert_eq!(first.failed, 2);
    assert!(!rejections_path(&lock).exists(), "transient failures are not rejections");

    hasher.failing.lock().unwrap().clear();
    let second = run(&lock, &catalog, &hasher, &opts).await.unwrap();
    assert_eq!(second.added, 1);
    assert_eq!(second.failed, 1);
    assert_eq!(catalog.resolve_count("v1", "3"), 2);
    assert!(LockState::load_from_path(&lock).unwrap().contains("v1", "2"));
}

#[tokio::test]
async fn corrupt_lock_file_aborts_without_overwriting() {
    let dir = tempdir().unwrap();
    let lock = dir.path().join("lock.json");
    std::fs::write(&lock, "not json").unwrap();
    let catalog = Arc::new(FakeCatalog::with_builds(&[("v1", "1")]));
    let hasher = Arc::new(FakeHasher::default());

    let err = run(&lock, &catalog, &hasher, &UpdateOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LockError>(),
        Some(LockError::CorruptState { .. })
    ));
    assert_eq!(std::fs::read_to_string(&lock).unwrap(), "not json");
    assert!(hasher.hashed().is_empty());
}

#[tokio::test]
async fn corrupt_rejection_ledger_aborts_without_overwriting() {
    let dir = tempdir().unwrap();
    let lock = dir.path().join("lock.json");
    let ledger = rejections_path(&lock);
    std::fs::write(&ledger, r#"{"v1": "11"}"#).unwrap();
    let catalog = Arc::new(FakeCatalog::with_builds(&[("v1", "10")]));
    let hasher = Arc::new(FakeHasher::default());

    let err = run(&lock, &catalog, &hasher, &UpdateOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LockError>(),
        Some(LockError::CorruptState { .. })
    ));
    assert_eq!(std::fs::read_to_string(&ledger).unwrap(), r#"{"v1": "11"}"#);
    assert!(!lock.exists(), "lock file not written after an aborted run");
    assert_eq!(catalog.resolve_count("v1", "10"), 0);
    assert!(hasher.hashed().is_empty());
}

#[tokio::test]
async fn progress_events_are_reported() {
    let dir = tempdir().unwrap();
    let lock = dir.path().join("lock.json");
    let catalog = Arc::new(FakeCatalog::with_builds(&[("1.20", "build-5")]));
    let hasher = Arc::new(FakeHasher::default());
    let (tx, mut rx) = tokio::sync::mpsc::channel(16);

    update_lock(
        &lock,
        catalog as Arc<dyn Catalog>,
        hasher as Arc<dyn ArtifactHasher>,
        &UpdateOptions::default(),
        Some(tx),
    )
    .await
    .unwrap();

    let mut events = Vec::new();
    while let Some(ev) = rx.recv().await {
        events.push(ev);
    }
    assert_eq!(
        events,
        vec![
            UpdateEvent::Planned {
                listed: 1,
                pending: 1
            },
            UpdateEvent::Added {
                version: "1.20".to_string(),
                build: "build-5".to_string()
            },
        ]
    );
}
