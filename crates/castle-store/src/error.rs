//! # Store Errors

use std::path::PathBuf;

use thiserror::Error;

use castle_state::DealError;

/// Failure to load or persist the document.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The file or directory involved.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document could not be serialized.
    #[error("failed to encode document: {0}")]
    Encode(#[source] serde_json::Error),

    /// The stored file is not a valid document.
    #[error("failed to decode {path}: {source}")]
    Decode {
        /// The file that was read.
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The stored document parsed but breaks a deal invariant.
    #[error("document {path} is inconsistent: {source}")]
    Invalid {
        /// The file that was read.
        path: PathBuf,
        #[source]
        source: DealError,
    },

    /// The backing store refused the write.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
