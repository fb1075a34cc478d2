//! Load/save lock documents as pretty JSON with atomic replacement.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::checksum;

use super::error::LockError;
use super::rejections::RejectionLedger;
use super::state::LockState;

impl LockState {
    /// Load state from `path`. A missing file yields an empty state; anything
    /// unparsable, or an entry whose digest is not 64 lowercase hex chars, is
    /// `LockError::CorruptState`.
    pub fn load_from_path(path: &Path) -> Result<LockState, LockError> {
        let Some(state) = load_json::<LockState>(path)? else {
            tracing::info!("no lock file at {}, starting from scratch", path.display());
            return Ok(LockState::new());
        };
        for (version, builds) in &state.versions {
            for (build, entry) in builds {
                if !checksum::is_sha256_hex(&entry.sha256) {
                    return Err(LockError::corrupt(
                        path,
                        format!("{} / {}: invalid sha256 {:?}", version, build, entry.sha256),
                    ));
                }
            }
        }
        Ok(state)
    }

    /// Replace the file at `path` with the full state.
    pub fn save_to_path(&self, path: &Path) -> Result<(), LockError> {
        save_json(path, self)
    }
}

impl RejectionLedger {
    /// Load the ledger; a missing file yields an empty ledger.
    pub fn load_from_path(path: &Path) -> Result<RejectionLedger, LockError> {
        Ok(load_json(path)?.unwrap_or_default())
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), LockError> {
        save_json(path, self)
    }
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, LockError> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(LockError::io(path, e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| LockError::corrupt(path, e.to_string()))
}

/// Two-space indented JSON with a trailing newline, written to a temp file in
/// the same directory and renamed over `path`.
fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), LockError> {
    let mut json = serde_json::to_string_pretty(value)
        .map_err(|e| LockError::io(path, std::io::Error::other(e)))?;
    json.push('\n');

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| LockError::io(dir, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| LockError::io(dir, e))?;
    tmp.write_all(json.as_bytes())
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| LockError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| LockError::io(path, e.error))?;
    Ok(())
}
