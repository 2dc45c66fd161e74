//! # JSON File Store
//!
//! Persists the [`Document`] as pretty-printed UTF-8 JSON.
//!
//! ## Crash Safety
//!
//! `save` never writes the target file in place:
//!
//! 1. serialize the full document into `.<name>.tmp` next to the target,
//! 2. `fsync` the temporary file,
//! 3. rename it over the target,
//! 4. `fsync` the containing directory (Unix) so the rename is durable.
//!
//! A crash before step 3 leaves the previous document untouched; a crash
//! after it leaves the new one. `load` removes a leftover temporary file
//! from an interrupted save.
//!
//! ## Sharing
//!
//! [`lock`](DurableStore::lock) takes an exclusive `fs2` lock on
//! `.<name>.lock` next to the target. Writers in other processes wait on
//! the same file.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::document::Document;
use crate::error::StoreError;
use crate::lock::StoreLock;
use crate::DurableStore;

/// Durable store backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The target document path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where an in-flight save is staged.
    pub fn temp_path(&self) -> PathBuf {
        self.sibling("tmp")
    }

    /// The file writers lock before touching the document.
    pub fn lock_path(&self) -> PathBuf {
        self.sibling("lock")
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "data.json".to_string());
        self.directory().join(format!(".{name}.{suffix}"))
    }

    fn directory(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn discard_stale_temp(&self) {
        let temp = self.temp_path();
        if !temp.exists() {
            return;
        }
        tracing::warn!(path = %temp.display(), "discarding temporary file from an interrupted save");
        if let Err(e) = fs::remove_file(&temp) {
            tracing::warn!(path = %temp.display(), error = %e, "failed to remove stale temporary file");
        }
    }

    fn write_temp(&self, temp: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let mut file = File::create(temp).map_err(|e| StoreError::io(temp, e))?;
        file.write_all(bytes).map_err(|e| StoreError::io(temp, e))?;
        file.sync_all().map_err(|e| StoreError::io(temp, e))
    }
}

impl DurableStore for JsonFileStore {
    fn load(&self) -> Result<Option<Document>, StoreError> {
        self.discard_stale_temp();

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        if content.trim().is_empty() {
            return Ok(None);
        }

        let document: Document =
            serde_json::from_str(&content).map_err(|source| StoreError::Decode {
                path: self.path.clone(),
                source,
            })?;
        document.validate().map_err(|source| StoreError::Invalid {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(
            path = %self.path.display(),
            users = document.users.len(),
            deals = document.deals.len(),
            "document loaded"
        );
        Ok(Some(document))
    }

    fn save(&self, document: &Document) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(document).map_err(StoreError::Encode)?;
        let directory = self.directory();
        fs::create_dir_all(&directory).map_err(|e| StoreError::io(&directory, e))?;

        let temp = self.temp_path();
        if let Err(e) = self.write_temp(&temp, &bytes) {
            let _ = fs::remove_file(&temp);
            return Err(e);
        }
        if let Err(e) = fs::rename(&temp, &self.path) {
            let _ = fs::remove_file(&temp);
            return Err(StoreError::io(&self.path, e));
        }
        sync_directory(&directory)?;
        tracing::trace!(path = %self.path.display(), bytes = bytes.len(), "document saved");
        Ok(())
    }

    fn lock(&self) -> Result<StoreLock, StoreError> {
        let directory = self.directory();
        fs::create_dir_all(&directory).map_err(|e| StoreError::io(&directory, e))?;
        StoreLock::acquire(&self.lock_path())
    }
}

#[cfg(unix)]
fn sync_directory(directory: &Path) -> Result<(), StoreError> {
    File::open(directory)
        .and_then(|dir| dir.sync_all())
        .map_err(|e| StoreError::io(directory, e))
}

#[cfg(not(unix))]
fn sync_directory(_directory: &Path) -> Result<(), StoreError> {
    Ok(())
}
