//! # castle-store — Durable Persistence
//!
//! The [`Document`] holds every account, deal and chat record. A
//! [`DurableStore`] loads and saves it as a unit:
//!
//! - [`JsonFileStore`]: crash-safe JSON file (temp file, fsync, rename,
//!   directory fsync).
//! - [`MemoryStore`]: volatile store with failure injection.
//!
//! ## Contract
//!
//! `save` either fully replaces the stored document or leaves the previous
//! one in place. Callers treat a mutation as committed only once `save`
//! returned `Ok`.
//!
//! Writers hold the store's [`StoreLock`] across their load, mutate and
//! save. When the lock reports itself shared, the document is re-read under
//! it before mutating.

pub mod document;
pub mod error;
pub mod file;
pub mod lock;
pub mod memory;

use std::sync::Arc;

pub use document::{ChatRecord, Document};
pub use error::StoreError;
pub use file::JsonFileStore;
pub use lock::StoreLock;
pub use memory::MemoryStore;

/// Atomic load/save of the full [`Document`].
pub trait DurableStore: Send + Sync {
    /// The stored document, or `None` if nothing has been saved yet.
    fn load(&self) -> Result<Option<Document>, StoreError>;

    /// Replace the stored document.
    fn save(&self, document: &Document) -> Result<(), StoreError>;

    /// Take the exclusive write lock. Stores private to one process need
    /// none and return [`StoreLock::unshared`].
    fn lock(&self) -> Result<StoreLock, StoreError> {
        Ok(StoreLock::unshared())
    }
}

impl<S: DurableStore + ?Sized> DurableStore for Arc<S> {
    fn load(&self) -> Result<Option<Document>, StoreError> {
        (**self).load()
    }

    fn save(&self, document: &Document) -> Result<(), StoreError> {
        (**self).save(document)
    }

    fn lock(&self) -> Result<StoreLock, StoreError> {
        (**self).lock()
    }
}

impl<S: DurableStore + ?Sized> DurableStore for Box<S> {
    fn load(&self) -> Result<Option<Document>, StoreError> {
        (**self).load()
    }

    fn save(&self, document: &Document) -> Result<(), StoreError> {
        (**self).save(document)
    }

    fn lock(&self) -> Result<StoreLock, StoreError> {
        (**self).lock()
    }
}
