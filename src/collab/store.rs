//! Document and delta storage
//!
//! The orchestrator only needs two capabilities from persistence: read and
//! compare-and-swap a document's `(content, version)` pair, and append/list
//! the applied operations (deltas). Both are traits so a database-backed
//! implementation can replace the in-memory ones used by tests and the CLI.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{StoreError, StoreResult};
use crate::ot::{Operation, PreImage};

/// Current state of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub content: String,
    pub version: u64,
}

/// One applied operation, keyed by the version it produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltaRecord {
    pub document_id: String,
    pub version: u64,
    pub operation: Operation,
    /// What the operation overwrote, for exact undo
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_image: Option<PreImage>,
    pub applied_at: DateTime<Utc>,
}

/// Trait for document content storage
pub trait DocumentStore: Send + Sync {
    /// Read a document's content and version
    fn get_document(&self, document_id: &str) -> StoreResult<DocumentSnapshot>;

    /// Replace content and version, only if the stored version still equals
    /// `expected_version`.
    fn update_document(
        &self,
        document_id: &str,
        content: &str,
        expected_version: u64,
        new_version: u64,
    ) -> StoreResult<()>;
}

/// Trait for the append-only delta history
pub trait DeltaStore: Send + Sync {
    /// Append a delta. Fails if one already exists for that version.
    fn append_delta(&self, record: DeltaRecord) -> StoreResult<()>;

    /// Deltas with `version > after`, ascending by version
    fn list_deltas_after(&self, document_id: &str, after: u64) -> StoreResult<Vec<DeltaRecord>>;
}

/// Document store held in memory
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<String, DocumentSnapshot>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite a document
    pub fn create_document(
        &self,
        document_id: impl Into<String>,
        content: impl Into<String>,
        version: u64,
    ) -> StoreResult<()> {
        let mut documents = self.documents.write().map_err(poisoned)?;
        documents.insert(
            document_id.into(),
            DocumentSnapshot {
                content: content.into(),
                version,
            },
        );
        Ok(())
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn get_document(&self, document_id: &str) -> StoreResult<DocumentSnapshot> {
        let documents = self.documents.read().map_err(poisoned)?;
        documents
            .get(document_id)
            .cloned()
            .ok_or_else(|| StoreError::DocumentNotFound(document_id.to_string()))
    }

    fn update_document(
        &self,
        document_id: &str,
        content: &str,
        expected_version: u64,
        new_version: u64,
    ) -> StoreResult<()> {
        let mut documents = self.documents.write().map_err(poisoned)?;
        let doc = documents
            .get_mut(document_id)
            .ok_or_else(|| StoreError::DocumentNotFound(document_id.to_string()))?;

        if doc.version != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                actual: doc.version,
            });
        }

        doc.content = content.to_string();
        doc.version = new_version;
        Ok(())
    }
}

/// Delta history held in memory
#[derive(Debug, Default)]
pub struct InMemoryDeltaStore {
    deltas: RwLock<HashMap<String, BTreeMap<u64, DeltaRecord>>>,
}

impl InMemoryDeltaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of deltas recorded for a document
    pub fn len(&self, document_id: &str) -> usize {
        self.deltas
            .read()
            .map(|d| d.get(document_id).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }
}

impl DeltaStore for InMemoryDeltaStore {
    fn append_delta(&self, record: DeltaRecord) -> StoreResult<()> {
        let mut deltas = self.deltas.write().map_err(poisoned)?;
        let history = deltas.entry(record.document_id.clone()).or_default();

        if history.contains_key(&record.version) {
            return Err(StoreError::DuplicateDelta {
                version: record.version,
            });
        }
        history.insert(record.version, record);
        Ok(())
    }

    fn list_deltas_after(&self, document_id: &str, after: u64) -> StoreResult<Vec<DeltaRecord>> {
        let deltas = self.deltas.read().map_err(poisoned)?;
        Ok(deltas
            .get(document_id)
            .map(|history| {
                history
                    .range(after.saturating_add(1)..)
                    .map(|(_, record)| record.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Backend(e.to_string())
}
