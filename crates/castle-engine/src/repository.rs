//! # Repository — Committed State Behind a Mutation Interface
//!
//! Owns the committed [`Document`] and the [`DurableStore`] it is flushed
//! to.
//!
//! ## Concurrency
//!
//! - A writer `Mutex` serializes mutations. Each mutation runs against a
//!   private copy of the committed document.
//! - The copy is saved while only the writer lock is held. If `save` fails
//!   the copy is dropped, so memory and disk never diverge.
//! - After a successful save the copy replaces the committed
//!   `Arc<Document>` under a short `RwLock` write.
//!
//! Readers take a cheap `Arc` clone of the committed document. They never
//! observe a half-applied mutation and never wait on storage I/O.
//!
//! ## Other processes
//!
//! Each mutation holds the store's [`StoreLock`] from load to save. When
//! the lock is shared the stored document is re-read under it, and a copy
//! written by another process becomes the committed document before
//! `mutate` runs.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use castle_store::{Document, DurableStore, StoreError, StoreLock};

/// Transactional access to the persisted document.
pub struct Repository {
    store: Box<dyn DurableStore>,
    writer: Mutex<()>,
    committed: RwLock<Arc<Document>>,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let committed = self.snapshot();
        f.debug_struct("Repository")
            .field("users", &committed.users.len())
            .field("deals", &committed.deals.len())
            .field("chats", &committed.chats.len())
            .finish_non_exhaustive()
    }
}

impl Repository {
    /// Load the stored document, or create and persist an empty one.
    pub fn open(store: impl DurableStore + 'static) -> Result<Self, StoreError> {
        let _lock = store.lock()?;
        let document = match store.load()? {
            Some(document) => document,
            None => {
                let document = Document::new();
                store.save(&document)?;
                tracing::info!("initialized empty document");
                document
            }
        };
        Ok(Self {
            store: Box::new(store),
            writer: Mutex::new(()),
            committed: RwLock::new(Arc::new(document)),
        })
    }

    /// The committed document.
    pub fn snapshot(&self) -> Arc<Document> {
        Arc::clone(&*self.committed.read())
    }

    /// Apply `mutate` to a copy of the committed document and commit it.
    ///
    /// The copy becomes the committed document only if `mutate` returns
    /// `Ok` and the store saves it. Otherwise the committed document is
    /// left exactly as it was.
    pub fn transact<R, E>(&self, mutate: impl FnOnce(&mut Document) -> Result<R, E>) -> Result<R, E>
    where
        E: From<StoreError>,
    {
        let _writer = self.writer.lock();
        let lock = self.store.lock().map_err(|e| {
            tracing::error!(error = %e, "failed to lock store, mutation abandoned");
            e
        })?;
        let base = self.current(&lock)?;
        let mut next = Document::clone(&base);
        let result = mutate(&mut next)?;

        if let Err(e) = self.store.save(&next) {
            tracing::error!(error = %e, "failed to persist document, mutation discarded");
            return Err(E::from(e));
        }
        *self.committed.write() = Arc::new(next);
        Ok(result)
    }

    /// The document a mutation starts from: the stored one when other
    /// processes may have written it, the committed one otherwise.
    fn current(&self, lock: &StoreLock) -> Result<Arc<Document>, StoreError> {
        let committed = self.snapshot();
        if !lock.is_shared() {
            return Ok(committed);
        }
        let stored = match self.store.load() {
            Ok(stored) => stored,
            Err(e) => {
                tracing::error!(error = %e, "failed to reload document, mutation abandoned");
                return Err(e);
            }
        };
        match stored {
            Some(stored) if stored != *committed => {
                tracing::debug!("document changed by another writer, reloaded");
                let stored = Arc::new(stored);
                *self.committed.write() = Arc::clone(&stored);
                Ok(stored)
            }
            _ => Ok(committed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use castle_core::ChatId;
    use castle_store::{ChatRecord, JsonFileStore, MemoryStore};

    fn chat(doc: &mut Document, message: i64) {
        doc.chats.insert(ChatId::new(1), ChatRecord { last_message_id: message });
    }

    #[test]
    fn test_open_persists_empty_document() {
        let store = Arc::new(MemoryStore::new());
        let repo = Repository::open(Arc::clone(&store)).unwrap();
        assert_eq!(store.snapshot(), Some(Document::new()));
        assert_eq!(*repo.snapshot(), Document::new());
    }

    #[test]
    fn test_open_uses_stored_document() {
        let mut doc = Document::new();
        chat(&mut doc, 5);
        let store = Arc::new(MemoryStore::with_document(doc.clone()));
        let repo = Repository::open(Arc::clone(&store)).unwrap();
        assert_eq!(*repo.snapshot(), doc);
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn test_transact_commits_after_save() {
        let store = Arc::new(MemoryStore::new());
        let repo = Repository::open(Arc::clone(&store)).unwrap();
        repo.transact(|doc| {
            chat(doc, 9);
            Ok::<_, StoreError>(())
        })
        .unwrap();
        assert_eq!(repo.snapshot().chats[&ChatId::new(1)].last_message_id, 9);
        assert_eq!(store.snapshot().unwrap().chats.len(), 1);
    }

    #[test]
    fn test_rejected_mutation_is_not_saved() {
        let store = Arc::new(MemoryStore::new());
        let repo = Repository::open(Arc::clone(&store)).unwrap();
        let saves = store.save_count();
        let result: Result<(), StoreError> = repo.transact(|doc| {
            chat(doc, 9);
            Err(StoreError::Unavailable("rejected".into()))
        });
        assert!(result.is_err());
        assert!(repo.snapshot().chats.is_empty());
        assert_eq!(store.save_count(), saves);
    }

    #[test]
    fn test_failed_save_discards_mutation() {
        let store = Arc::new(MemoryStore::new());
        let repo = Repository::open(Arc::clone(&store)).unwrap();
        store.set_fail_saves(true);
        let result = repo.transact(|doc| {
            chat(doc, 9);
            Ok::<_, StoreError>(())
        });
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert!(repo.snapshot().chats.is_empty());
    }

    #[test]
    fn test_writers_on_one_file_see_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let first = Repository::open(JsonFileStore::new(&path)).unwrap();
        let second = Repository::open(JsonFileStore::new(&path)).unwrap();

        first
            .transact(|doc| {
                chat(doc, 1);
                Ok::<_, StoreError>(())
            })
            .unwrap();
        let seen = second
            .transact(|doc| {
                let seen = doc.chats.get(&ChatId::new(1)).map(|c| c.last_message_id);
                Ok::<_, StoreError>(seen)
            })
            .unwrap();
        assert_eq!(seen, Some(1));
        assert_eq!(second.snapshot().chats.len(), 1);
    }

    #[test]
    fn test_snapshot_is_stable_across_commits() {
        let repo = Repository::open(MemoryStore::new()).unwrap();
        let before = repo.snapshot();
        repo.transact(|doc| {
            chat(doc, 1);
            Ok::<_, StoreError>(())
        })
        .unwrap();
        assert!(before.chats.is_empty());
        assert_eq!(repo.snapshot().chats.len(), 1);
    }
}
