//! `jarlock verify` – compare a local artifact with its locked hash.

use anyhow::Result;
use jarlock_core::checksum;
use jarlock_core::config::JarlockConfig;
use jarlock_core::lock::LockState;
use std::path::Path;

use super::select_sources;

pub fn run_verify(
    cfg: &JarlockConfig,
    work_dir: &Path,
    source: &str,
    version: &str,
    build: &str,
    path: &Path,
) -> Result<()> {
    let selected = select_sources(cfg, &[source.to_string()])?;
    let lock_path = selected[0].lock_path_in(work_dir);
    let state = LockState::load_from_path(&lock_path)?;
    let entry = state.get(version, build).ok_or_else(|| {
        anyhow::anyhow!(
            "{} has no entry for version {} build {}",
            lock_path.display(),
            version,
            build
        )
    })?;

    verify_file(path, &entry.sha256)?;
    println!("OK  {}  {}", entry.sha256, path.display());
    Ok(())
}

pub(crate) fn verify_file(path: &Path, expected: &str) -> Result<()> {
    let actual = checksum::sha256_path(path)?;
    if actual != expected {
        anyhow::bail!(
            "checksum mismatch for {}: expected {}, got {}",
            path.display(),
            expected,
            actual
        );
    }
    Ok(())
}
