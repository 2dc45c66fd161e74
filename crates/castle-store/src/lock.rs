//! # Cross-Process Write Lock
//!
//! Several processes may open the same document file (a long-running
//! front-end and one-shot `castle` invocations). Each of them mutates a
//! private copy and renames it over the target, so writers must be
//! serialized across processes, and each writer must start from the
//! document as it is on disk rather than from its own cached copy.
//!
//! [`StoreLock`] is an advisory exclusive lock (`flock` on Unix,
//! `LockFileEx` on Windows) on a sibling lock file. It is released when the
//! guard drops. The lock file itself is left in place: removing it while
//! another process waits on it would let two writers lock different inodes.

use std::fs::{File, OpenOptions};
use std::path::Path;

use fs2::FileExt;

use crate::error::StoreError;

/// Exclusive write lock on a store, held until dropped.
#[derive(Debug)]
pub struct StoreLock {
    file: Option<File>,
}

impl StoreLock {
    /// A lock for a store no other process can reach.
    pub fn unshared() -> Self {
        Self { file: None }
    }

    /// Block until the exclusive lock on `path` is held.
    pub(crate) fn acquire(path: &Path) -> Result<Self, StoreError> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| StoreError::io(path, e))?;
        file.lock_exclusive().map_err(|e| StoreError::io(path, e))?;
        tracing::trace!(path = %path.display(), "store lock acquired");
        Ok(Self { file: Some(file) })
    }

    /// Whether other processes may write the store, so the stored document
    /// must be re-read while this lock is held.
    pub fn is_shared(&self) -> bool {
        self.file.is_some()
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Some(file) = &self.file {
            if let Err(e) = file.unlock() {
                tracing::warn!(error = %e, "failed to release store lock");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unshared_lock_holds_no_file() {
        assert!(!StoreLock::unshared().is_shared());
    }

    #[test]
    fn test_lock_excludes_second_holder_until_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".data.json.lock");

        let held = StoreLock::acquire(&path).unwrap();
        assert!(held.is_shared());

        let other = File::open(&path).unwrap();
        assert!(other.try_lock_exclusive().is_err());

        drop(held);
        other.try_lock_exclusive().unwrap();
        other.unlock().unwrap();
    }
}
