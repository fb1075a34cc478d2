//! Bounded execution of resolve + hash tasks.
//!
//! Keeps up to `max_concurrent` tasks in flight; a new task starts only when
//! one finishes. Results come back to this single loop, which owns the lock
//! state, so merges need no locking.

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::catalog::{Catalog, Listing, Resolution};
use crate::fetcher::ArtifactHasher;
use crate::lock::{LockEntry, LockState, RejectionLedger};

use super::UpdateReport;

/// Progress notifications for callers that want to print status lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateEvent {
    Planned { listed: usize, pending: usize },
    Added { version: String, build: String },
    Rejected { version: String, build: String },
    Failed { version: String, build: String },
}

enum Outcome {
    Hashed(Listing, LockEntry),
    Rejected(Listing),
    Failed(Listing),
}

fn process(listing: Listing, catalog: &dyn Catalog, hasher: &dyn ArtifactHasher) -> Outcome {
    let candidate = match catalog.resolve(&listing) {
        Resolution::Ready(c) => c,
        Resolution::Rejected => {
            tracing::info!("skipping {} / {}: rejected upstream", listing.version, listing.build);
            return Outcome::Rejected(listing);
        }
        Resolution::Unavailable => {
            tracing::warn!("skipping {} / {}: build info unavailable", listing.version, listing.build);
            return Outcome::Failed(listing);
        }
    };
    tracing::info!("found new build {} for version {}", candidate.build, candidate.version);
    match hasher.sha256(&candidate.download_url) {
        Some(sha256) => Outcome::Hashed(
            listing,
            LockEntry {
                url: candidate.download_url,
                sha256,
            },
        ),
        None => Outcome::Failed(listing),
    }
}

#[allow(clippy::too_many_arguments)]
pub(super) async fn run_bounded(
    pending: Vec<Listing>,
    catalog: Arc<dyn Catalog>,
    hasher: Arc<dyn ArtifactHasher>,
    max_concurrent: usize,
    state: &mut LockState,
    ledger: &mut RejectionLedger,
    report: &mut UpdateReport,
    progress_tx: Option<&tokio::sync::mpsc::Sender<UpdateEvent>>,
) {
    let max_concurrent = max_concurrent.max(1);
    let mut queue = pending.into_iter();
    let mut join_set = JoinSet::new();

    loop {
        while join_set.len() < max_concurrent {
            let Some(listing) = queue.next() else {
                break;
            };
            let catalog = Arc::clone(&catalog);
            let hasher = Arc::clone(&hasher);
            join_set.spawn_blocking(move || process(listing, catalog.as_ref(), hasher.as_ref()));
        }

        let Some(res) = join_set.join_next().await else {
            break;
        };
        let event = match res {
            Ok(Outcome::Hashed(listing, entry)) => {
                if state.merge(&listing.version, &listing.build, entry) {
                    report.added += 1;
                }
                UpdateEvent::Added {
                    version: listing.version,
                    build: listing.build,
                }
            }
            Ok(Outcome::Rejected(listing)) => {
                ledger.insert(&listing.version, &listing.build);
                report.rejected += 1;
                UpdateEvent::Rejected {
                    version: listing.version,
                    build: listing.build,
                }
            }
            Ok(Outcome::Failed(listing)) => {
                report.failed += 1;
                UpdateEvent::Failed {
                    version: listing.version,
                    build: listing.build,
                }
            }
            Err(e) => {
                tracing::error!("hash task join: {}", e);
                report.failed += 1;
                continue;
            }
        };
        if let Some(tx) = progress_tx {
            let _ = tx.send(event).await;
        }
    }
}
