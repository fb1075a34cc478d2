//! Lock store: the persisted version → build → {url, sha256} record.
//!
//! `LockState` is loaded once per run, threaded by value through the update
//! orchestrator and written back atomically at the end. A `(version, build)`
//! pair that has an entry is never fetched or hashed again.
//!
//! Builds that upstream marked as failed are kept out of the lock file and
//! remembered in a sidecar `RejectionLedger` instead.

mod error;
mod persist;
mod rejections;
mod state;

pub use error::LockError;
pub use rejections::{rejections_path, RejectionLedger};
pub use state::{LockEntry, LockState};
