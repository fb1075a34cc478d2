//! Update orchestrator.
//!
//! Loads the lock state, asks the catalog what exists upstream, keeps only
//! what is neither locked nor known-rejected, resolves and hashes those with
//! at most `max_concurrent` tasks in flight, merges the results and writes
//! the state back.

mod plan;
mod run;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::config::JarlockConfig;
use crate::fetcher::ArtifactHasher;
use crate::lock::{rejections_path, LockState, RejectionLedger};

pub use plan::{plan, Plan};
pub use run::UpdateEvent;

/// Knobs for one update run.
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// Maximum resolve/hash tasks in flight at once.
    pub max_concurrent: usize,
    /// Persist upstream rejections in the sidecar ledger.
    pub remember_rejections: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            remember_rejections: true,
        }
    }
}

impl From<&JarlockConfig> for UpdateOptions {
    fn from(cfg: &JarlockConfig) -> Self {
        Self {
            max_concurrent: cfg.max_concurrent,
            remember_rejections: cfg.remember_rejections,
        }
    }
}

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Builds the catalog listed.
    pub listed: usize,
    /// Listed builds already present in the lock file.
    pub skipped_known: usize,
    /// Listed builds skipped because they were rejected on an earlier run.
    pub skipped_rejected: usize,
    /// New entries merged and persisted.
    pub added: usize,
    /// Builds newly rejected by upstream this run.
    pub rejected: usize,
    /// Builds that could not be resolved or hashed; retried next run.
    pub failed: usize,
}

/// Run one incremental update of the lock file at `lock_path`.
///
/// Errors only when the lock file (or its rejection ledger) cannot be read,
/// parsed or written; per-build failures are counted in the report.
pub async fn update_lock(
    lock_path: &Path,
    catalog: Arc<dyn Catalog>,
    hasher: Arc<dyn ArtifactHasher>,
    opts: &UpdateOptions,
    progress_tx: Option<tokio::sync::mpsc::Sender<UpdateEvent>>,
) -> Result<UpdateReport> {
    let mut state = LockState::load_from_path(lock_path)?;
    let ledger_path: Option<PathBuf> = opts
        .remember_rejections
        .then(|| rejections_path(lock_path));
    let mut ledger = match &ledger_path {
        Some(p) => RejectionLedger::load_from_path(p)?,
        None => RejectionLedger::new(),
    };
    tracing::info!(
        "loaded {} entries across {} versions from {}",
        state.entry_count(),
        state.version_count(),
        lock_path.display()
    );

    let listings = tokio::task::spawn_blocking({
        let catalog = Arc::clone(&catalog);
        move || catalog.list_candidates()
    })
    .await
    .context("listing task join")?;

    let plan = plan(listings, &state, &ledger);
    let mut report = UpdateReport {
        listed: plan.listed,
        skipped_known: plan.known,
        skipped_rejected: plan.rejected,
        ..UpdateReport::default()
    };
    tracing::info!(
        "{} listed, {} already locked, {} previously rejected, {} to fetch",
        plan.listed,
        plan.known,
        plan.rejected,
        plan.pending.len()
    );
    if let Some(tx) = &progress_tx {
        let _ = tx
            .send(UpdateEvent::Planned {
                listed: plan.listed,
                pending: plan.pending.len(),
            })
            .await;
    }

    let ledger_before = ledger.len();
    run::run_bounded(
        plan.pending,
        catalog,
        hasher,
        opts.max_concurrent,
        &mut state,
        &mut ledger,
        &mut report,
        progress_tx.as_ref(),
    )
    .await;

    state.save_to_path(lock_path)?;
    if let Some(p) = &ledger_path {
        if ledger.len() != ledger_before {
            ledger.save_to_path(p)?;
        }
    }
    tracing::info!(
        "saved {}: {} added, {} rejected, {} failed",
        lock_path.display(),
        report.added,
        report.rejected,
        report.failed
    );
    Ok(report)
}

#[cfg(test)]
mod tests;
