use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures touching persisted state. Both variants abort a run.
#[derive(Debug, Error)]
pub enum LockError {
    /// The file exists but is not a well-formed lock document. Never overwritten.
    #[error("corrupt lock state in {path}: {reason}")]
    CorruptState { path: PathBuf, reason: String },

    #[error("lock file I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LockError {
    pub(super) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(super) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptState {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
