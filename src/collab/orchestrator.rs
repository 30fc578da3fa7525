//! # Operation Orchestrator
//!
//! Drives one incoming operation through
//! Received → Validated → Authorized → (Transformed) → Applied → Confirmed,
//! with Rejected as the only other terminal state.
//!
//! ## Commit protocol
//!
//! Work on a document is serialized by a per-document lock, and the
//! document write is a compare-and-swap on the version read at the start of
//! the attempt. Appending the delta is the commit point: once the delta for
//! version N+1 exists the edit is durable even if the document row has not
//! been advanced yet. Every attempt first rolls the document forward over
//! any such committed-but-unapplied deltas.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::EngineConfig;
use super::errors::{CollabError, CollabResult, StoreError};
use super::events::CollabEvent;
use super::locks::DocumentLocks;
use super::permissions::PermissionChecker;
use super::store::{DeltaRecord, DeltaStore, DocumentSnapshot, DocumentStore};
use crate::ot::operation::char_len;
use crate::ot::{
    apply_operation, invert_with_pre_image, validate, Operation, OperationKind, OperationResult,
    Position, PreImage,
};

/// What processing an operation produced
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub result: OperationResult,
    /// The operation lost a last-writer-wins contest and changed nothing
    pub voided: bool,
}

/// Applies operations to documents held in the configured stores
pub struct Orchestrator {
    documents: Arc<dyn DocumentStore>,
    deltas: Arc<dyn DeltaStore>,
    permissions: Arc<dyn PermissionChecker>,
    config: EngineConfig,
    locks: DocumentLocks,
    events: broadcast::Sender<CollabEvent>,
}

impl Orchestrator {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        deltas: Arc<dyn DeltaStore>,
        permissions: Arc<dyn PermissionChecker>,
        config: EngineConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_channel_capacity);
        Self {
            documents,
            deltas,
            permissions,
            config,
            locks: DocumentLocks::new(),
            events,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Receive every event emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<CollabEvent> {
        self.events.subscribe()
    }

    /// Process an operation and return its structured result.
    ///
    /// Never fails: rejections and apply failures come back as
    /// `success: false` with an error code.
    pub async fn process_incoming_operation(&self, op: Operation) -> OperationResult {
        self.process_from_session(op, None).await
    }

    /// [`Self::process_incoming_operation`], tagging the broadcast with the
    /// submitting session so it can skip its own echo.
    pub async fn process_from_session(
        &self,
        op: Operation,
        session_id: Option<String>,
    ) -> OperationResult {
        match self.try_process(&op).await {
            Ok(outcome) => {
                self.emit(CollabEvent::confirmed(&op.id, &outcome.result));
                if !outcome.voided {
                    if let Some(applied) = &outcome.result.transformed_operation {
                        self.emit(CollabEvent::broadcasted(
                            applied.clone(),
                            session_id,
                            outcome.result.new_version,
                        ));
                    }
                }
                outcome.result
            }
            Err(err) => self.fail(&op.id, &op.document_id, op.version, err),
        }
    }

    /// Process an operation, surfacing failures as errors.
    pub async fn try_process(&self, op: &Operation) -> CollabResult<ProcessOutcome> {
        validate(op)?;

        let operation_type = op.op_type();
        if !self
            .permissions
            .has_permission(&op.user_id, &op.document_id, operation_type)?
        {
            return Err(CollabError::PermissionDenied {
                user_id: op.user_id.clone(),
                document_id: op.document_id.clone(),
                operation_type,
            });
        }

        let _guard = self.locks.acquire(&op.document_id).await;

        let attempts = self.config.max_apply_retries;
        for attempt in 1..=attempts {
            if let Some(outcome) = self.apply_once(op)? {
                return Ok(outcome);
            }
            warn!(
                document_id = %op.document_id,
                operation_id = %op.id,
                attempt,
                "document version moved during apply, retrying"
            );
        }
        Err(CollabError::VersionConflict { attempts })
    }

    /// Replay committed deltas the document row has not caught up with.
    pub async fn roll_forward(&self, document_id: &str) -> CollabResult<DocumentSnapshot> {
        let _guard = self.locks.acquire(document_id).await;

        let attempts = self.config.max_apply_retries;
        for _ in 0..attempts {
            if let Some(snapshot) = self.catch_up(document_id)? {
                return Ok(snapshot);
            }
        }
        Err(CollabError::VersionConflict { attempts })
    }

    /// Undo the operation that produced `version`.
    ///
    /// The inverse is authored against `version` and submitted like any
    /// other operation, so it is transformed through everything applied
    /// since.
    pub async fn undo(&self, document_id: &str, version: u64, user_id: &str) -> OperationResult {
        match self.undo_operation(document_id, version, user_id) {
            Ok(inverse) => self.process_incoming_operation(inverse).await,
            Err(err) => self.fail(&format!("undo-{version}"), document_id, version, err),
        }
    }

    /// Build the inverse of the operation that produced `version`
    pub fn undo_operation(
        &self,
        document_id: &str,
        version: u64,
        user_id: &str,
    ) -> CollabResult<Operation> {
        let record = self
            .deltas
            .list_deltas_after(document_id, version.saturating_sub(1))?
            .into_iter()
            .find(|record| record.version == version)
            .ok_or_else(|| CollabError::DeltaNotFound {
                document_id: document_id.to_string(),
                version,
            })?;

        let mut inverse = invert_with_pre_image(&record.operation, record.pre_image.as_ref());
        inverse.id = Uuid::new_v4().to_string();
        inverse.user_id = user_id.to_string();
        inverse.version = version;
        inverse.timestamp = Utc::now();
        Ok(inverse)
    }

    /// One transform/apply/commit attempt. `None` means another writer got
    /// there first and the caller should retry.
    fn apply_once(&self, op: &Operation) -> CollabResult<Option<ProcessOutcome>> {
        let Some(snapshot) = self.catch_up(&op.document_id)? else {
            return Ok(None);
        };

        let missed: Vec<Operation> = if op.version < snapshot.version {
            self.deltas
                .list_deltas_after(&op.document_id, op.version)?
                .into_iter()
                .filter(|record| record.version <= snapshot.version)
                .map(|record| record.operation)
                .collect()
        } else {
            if op.version > snapshot.version {
                warn!(
                    document_id = %op.document_id,
                    operation_id = %op.id,
                    version = op.version,
                    current = snapshot.version,
                    "operation authored against a version not yet reached"
                );
            }
            Vec::new()
        };

        let report = self.config.pipeline().run(op, &missed);
        let conflicts = report.conflict_labels();
        let mut transformed = report.operation;

        if !missed.is_empty() {
            debug!(
                document_id = %op.document_id,
                operation_id = %op.id,
                missed = missed.len(),
                conflicts = ?conflicts,
                "transformed stale operation"
            );
        }

        if report.cancelled {
            info!(
                document_id = %op.document_id,
                operation_id = %op.id,
                conflicts = ?conflicts,
                "operation voided by a newer edit"
            );
            return Ok(Some(ProcessOutcome {
                result: OperationResult::applied(transformed, conflicts, snapshot.version),
                voided: true,
            }));
        }

        let applied = apply_operation(&snapshot.content, &transformed)
            .map_err(|e| CollabError::from(e).with_conflicts(conflicts.clone()))?;
        let pre_image = match &transformed.kind {
            OperationKind::CitationUpdate(c) => {
                self.citation_pre_image(&op.document_id, &c.citation_id)?
            }
            _ => applied.pre_image,
        };

        // Line and column drift under transforms; pin them to real content.
        if transformed.offset() <= char_len(&snapshot.content) {
            transformed.position = Position::from_offset(&snapshot.content, transformed.offset());
        }

        let new_version = snapshot.version + 1;
        transformed.version = new_version;

        let record = DeltaRecord {
            document_id: op.document_id.clone(),
            version: new_version,
            operation: transformed.clone(),
            pre_image,
            applied_at: Utc::now(),
        };
        match self.deltas.append_delta(record) {
            Ok(()) => {}
            Err(StoreError::DuplicateDelta { .. }) => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        // Committed. A failed row update is repaired by the next roll-forward.
        if let Err(e) = self.documents.update_document(
            &op.document_id,
            &applied.content,
            snapshot.version,
            new_version,
        ) {
            warn!(
                document_id = %op.document_id,
                version = new_version,
                error = %e,
                "document row not advanced after commit"
            );
        }

        info!(
            document_id = %op.document_id,
            operation_id = %op.id,
            version = new_version,
            "operation applied"
        );

        Ok(Some(ProcessOutcome {
            result: OperationResult::applied(transformed, conflicts, new_version),
            voided: false,
        }))
    }

    /// Read the document, applying committed deltas past its stored version.
    /// `None` if the compare-and-swap lost to another writer.
    fn catch_up(&self, document_id: &str) -> CollabResult<Option<DocumentSnapshot>> {
        let stored = self.documents.get_document(document_id)?;
        let pending = self.deltas.list_deltas_after(document_id, stored.version)?;
        if pending.is_empty() {
            return Ok(Some(stored));
        }

        let mut snapshot = stored.clone();
        for record in &pending {
            if record.version != snapshot.version + 1 {
                warn!(
                    document_id,
                    expected = snapshot.version + 1,
                    found = record.version,
                    "gap in delta history, stopping roll-forward"
                );
                break;
            }
            snapshot.content = apply_operation(&snapshot.content, &record.operation)?.content;
            snapshot.version = record.version;
        }

        if snapshot.version == stored.version {
            return Ok(Some(stored));
        }

        match self.documents.update_document(
            document_id,
            &snapshot.content,
            stored.version,
            snapshot.version,
        ) {
            Ok(()) => {
                info!(
                    document_id,
                    from = stored.version,
                    to = snapshot.version,
                    "rolled document forward over committed deltas"
                );
                Ok(Some(snapshot))
            }
            Err(StoreError::VersionConflict { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Fields of `citation_id` before the update now being applied
    fn citation_pre_image(
        &self,
        document_id: &str,
        citation_id: &str,
    ) -> CollabResult<Option<PreImage>> {
        let history = self.deltas.list_deltas_after(document_id, 0)?;
        let latest = history.iter().rev().find_map(|record| match &record.operation.kind {
            OperationKind::CitationInsert(c) | OperationKind::CitationUpdate(c)
                if c.citation_id == citation_id =>
            {
                Some(Some(PreImage::Citation {
                    citation_text: c.citation_text.clone(),
                    reference_id: c.reference_id.clone(),
                }))
            }
            OperationKind::CitationDelete(c) if c.citation_id == citation_id => Some(None),
            _ => None,
        });
        Ok(latest.flatten())
    }

    fn fail(
        &self,
        operation_id: &str,
        document_id: &str,
        fallback_version: u64,
        err: CollabError,
    ) -> OperationResult {
        if err.is_rejection() {
            warn!(document_id, operation_id, code = err.code(), "operation rejected: {err}");
        } else {
            warn!(document_id, operation_id, code = err.code(), "operation failed: {err}");
        }

        let version = self
            .documents
            .get_document(document_id)
            .map_or(fallback_version, |doc| doc.version);
        let mut result = OperationResult::failed(err.code(), err.to_string(), version);
        result.conflicts = err.conflicts().to_vec();
        if let Some(error) = &result.error {
            self.emit(CollabEvent::failed(
                operation_id,
                error.clone(),
                result.conflicts.clone(),
            ));
        }
        result
    }

    fn emit(&self, event: CollabEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
