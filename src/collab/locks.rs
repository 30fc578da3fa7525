//! Per-document serialization
//!
//! Operations on one document run one at a time; different documents
//! proceed in parallel. A document's lock is dropped from the map once no
//! task holds or waits on it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OwnedMutexGuard;

type DocumentMutex = Arc<tokio::sync::Mutex<()>>;

/// One async mutex per document id, created on first use
#[derive(Debug, Default)]
pub struct DocumentLocks {
    locks: Mutex<HashMap<String, DocumentMutex>>,
}

/// Exclusive access to one document, released on drop
#[derive(Debug)]
pub struct DocumentGuard<'a> {
    locks: &'a DocumentLocks,
    document_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl DocumentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `document_id`
    pub async fn acquire(&self, document_id: &str) -> DocumentGuard<'_> {
        let guard = self.lock_for(document_id).lock_owned().await;
        DocumentGuard {
            locks: self,
            document_id: document_id.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of documents with a lock allocated
    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_for(&self, document_id: &str) -> DocumentMutex {
        Arc::clone(self.map().entry(document_id.to_string()).or_default())
    }

    /// Remove the entry if only the map still refers to it
    fn release(&self, document_id: &str) {
        let mut locks = self.map();
        if locks
            .get(document_id)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
        {
            locks.remove(document_id);
        }
    }

    // The map is only held to clone or drop an Arc; a poisoned map is still usable.
    fn map(&self) -> MutexGuard<'_, HashMap<String, DocumentMutex>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for DocumentGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.release(&self.document_id);
    }
}
