//! `jarlock status` – summarize lock files without touching the network.

use anyhow::Result;
use jarlock_core::config::JarlockConfig;
use jarlock_core::lock::{rejections_path, LockState, RejectionLedger};
use std::path::Path;

use super::select_sources;

pub fn run_status(cfg: &JarlockConfig, work_dir: &Path, sources: &[String]) -> Result<()> {
    for source in select_sources(cfg, sources)? {
        let lock_path = source.lock_path_in(work_dir);
        let state = LockState::load_from_path(&lock_path)?;
        let rejected = RejectionLedger::load_from_path(&rejections_path(&lock_path))?;
        println!(
            "{} ({:?}) {}: {} versions, {} builds, {} rejected",
            source.name,
            source.policy,
            lock_path.display(),
            state.version_count(),
            state.entry_count(),
            rejected.len()
        );
        for (version, builds) in state.iter() {
            println!("  {:<16} {} builds", version, builds.len());
        }
    }
    Ok(())
}
