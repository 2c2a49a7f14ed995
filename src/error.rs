// src/error.rs
//! Typed errors for the core.
//!
//! Malformed source and verification timeouts are NOT errors here: the
//! extractor yields zero units and the verifier returns `Verdict::Unknown`.
//! Only caller mistakes and persistence problems surface as `Error`.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The caller supplied an out-of-range or nonsensical parameter.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Reading or writing persisted state failed.
    #[error("persistence failure at {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Persisted state exists but cannot be decoded.
    #[error("corrupt state at {}: {reason}", .path.display())]
    CorruptState { path: PathBuf, reason: String },
}

impl Error {
    pub(crate) fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }
}
