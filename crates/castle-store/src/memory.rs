//! # In-Memory Store
//!
//! A [`DurableStore`] that keeps the last saved document in memory. Saves
//! can be made to fail on demand to exercise the persistence-failure path.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::document::Document;
use crate::error::StoreError;
use crate::DurableStore;

/// Volatile store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: Mutex<Option<Document>>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStore {
    /// An empty store; the first `load` returns `None`.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `document`.
    pub fn with_document(document: Document) -> Self {
        Self {
            document: Mutex::new(Some(document)),
            ..Self::default()
        }
    }

    /// Make every subsequent `save` fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// The last successfully saved document.
    pub fn snapshot(&self) -> Option<Document> {
        self.document.lock().clone()
    }
}

impl DurableStore for MemoryStore {
    fn load(&self) -> Result<Option<Document>, StoreError> {
        Ok(self.document.lock().clone())
    }

    fn save(&self, document: &Document) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is failing saves".to_string()));
        }
        *self.document.lock() = Some(document.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
