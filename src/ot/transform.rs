//! Operation transform engine
//!
//! Pure functions that rewrite one operation so it can be applied on top of
//! a document that another, already-applied operation has changed.
//!
//! Conflicts are detected and labelled here; resolution beyond the
//! last-writer-wins rules below is left to the conflict resolver or the
//! caller.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::operation::{CitationFields, Operation, OperationKind};
use super::position::transform_position;

/// Two citations closer than this (in characters) contend for position
pub const CITATION_PROXIMITY: i64 = 5;

/// Label attached to a detected conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConflictType {
    /// Two text inserts at the identical offset
    #[serde(rename = "SAME_POSITION_INSERT")]
    SamePositionInsert,
    /// A text edit touches a citation's span
    #[serde(rename = "text-citation-overlap")]
    TextCitationOverlap,
    /// A text delete removed the whole citation span
    #[serde(rename = "citation-deleted")]
    CitationDeleted,
    /// Another user deleted the same citation
    #[serde(rename = "citation-deleted-by-other")]
    CitationDeletedByOther,
    /// Another user updated the same citation to a different reference
    #[serde(rename = "citation-updated-by-other")]
    CitationUpdatedByOther,
    /// Another user changed the same citation's text, same reference
    #[serde(rename = "citation-text-updated")]
    CitationTextUpdated,
    /// The same citation id was inserted twice
    #[serde(rename = "duplicate-citation-insert")]
    DuplicateCitationInsert,
    /// Two different citations anchored within the proximity window
    #[serde(rename = "citation-position-conflict")]
    CitationPositionConflict,
    /// A newer update superseded this operation
    #[serde(rename = "citation-updated")]
    CitationUpdated,
    /// A newer delete voided this operation
    #[serde(rename = "operation-cancelled")]
    OperationCancelled,
}

impl ConflictType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictType::SamePositionInsert => "SAME_POSITION_INSERT",
            ConflictType::TextCitationOverlap => "text-citation-overlap",
            ConflictType::CitationDeleted => "citation-deleted",
            ConflictType::CitationDeletedByOther => "citation-deleted-by-other",
            ConflictType::CitationUpdatedByOther => "citation-updated-by-other",
            ConflictType::CitationTextUpdated => "citation-text-updated",
            ConflictType::DuplicateCitationInsert => "duplicate-citation-insert",
            ConflictType::CitationPositionConflict => "citation-position-conflict",
            ConflictType::CitationUpdated => "citation-updated",
            ConflictType::OperationCancelled => "operation-cancelled",
        }
    }

    /// Label used when the conflicting operation is newer than the one
    /// being transformed: the newer side wins outright.
    fn superseded(self) -> Self {
        match self {
            ConflictType::CitationUpdatedByOther | ConflictType::CitationTextUpdated => {
                ConflictType::CitationUpdated
            }
            ConflictType::CitationDeletedByOther | ConflictType::CitationDeleted => {
                ConflictType::OperationCancelled
            }
            other => other,
        }
    }

    /// Whether this label means the transformed operation has no effect left
    pub fn voids_operation(&self) -> bool {
        matches!(
            self,
            ConflictType::CitationUpdated | ConflictType::OperationCancelled
        )
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of transforming one operation against another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutcome {
    pub transformed: Operation,
    pub has_conflict: bool,
    pub conflict_type: Option<ConflictType>,
    /// The operation lost to, or duplicates, the already-applied one and
    /// must not touch the document.
    pub cancelled: bool,
}

impl TransformOutcome {
    fn clean(transformed: Operation) -> Self {
        Self {
            transformed,
            has_conflict: false,
            conflict_type: None,
            cancelled: false,
        }
    }

    fn conflicted(transformed: Operation, conflict: ConflictType, cancelled: bool) -> Self {
        Self {
            transformed,
            has_conflict: true,
            conflict_type: Some(conflict),
            cancelled,
        }
    }
}

/// Transforms `op` against `conflicting`, dispatching on the kind of `op`.
pub fn transform_against(op: &Operation, conflicting: &Operation) -> TransformOutcome {
    transform_against_within(op, conflicting, CITATION_PROXIMITY)
}

/// [`transform_against`] with an explicit citation proximity window
pub fn transform_against_within(
    op: &Operation,
    conflicting: &Operation,
    citation_proximity: i64,
) -> TransformOutcome {
    match &op.kind {
        OperationKind::TextInsert { .. }
        | OperationKind::TextDelete { .. }
        | OperationKind::TextFormat { .. } => transform_text_operation(op, conflicting),
        OperationKind::CitationInsert(_)
        | OperationKind::CitationUpdate(_)
        | OperationKind::CitationDelete(_) => {
            transform_citation_operation_within(op, conflicting, citation_proximity)
        }
        OperationKind::CursorMove { .. } => transform_cursor_operation(op, conflicting),
    }
}

/// Transforms a text operation against an already-applied operation.
///
/// Cursor moves never affect text. Otherwise the operation's position is
/// shifted by the conflicting layout change. Two inserts at the identical
/// offset are flagged `SAME_POSITION_INSERT`; the already-applied insert
/// stays first.
pub fn transform_text_operation(op: &Operation, conflicting: &Operation) -> TransformOutcome {
    if matches!(conflicting.kind, OperationKind::CursorMove { .. }) {
        return TransformOutcome::clean(op.clone());
    }

    let same_position_insert = matches!(op.kind, OperationKind::TextInsert { .. })
        && matches!(conflicting.kind, OperationKind::TextInsert { .. })
        && op.offset() == conflicting.offset();

    let mut transformed = op.clone();
    transformed.position = transform_position(&op.position, conflicting);

    if same_position_insert {
        TransformOutcome::conflicted(transformed, ConflictType::SamePositionInsert, false)
    } else {
        TransformOutcome::clean(transformed)
    }
}

/// Transforms a cursor move; both the origin and the target follow layout.
pub fn transform_cursor_operation(op: &Operation, conflicting: &Operation) -> TransformOutcome {
    let mut transformed = op.clone();
    transformed.position = transform_position(&op.position, conflicting);
    if let OperationKind::CursorMove { new_position } = &mut transformed.kind {
        *new_position = transform_position(new_position, conflicting);
    }
    TransformOutcome::clean(transformed)
}

/// [`transform_citation_operation_within`] with the default proximity window
pub fn transform_citation_operation(op: &Operation, conflicting: &Operation) -> TransformOutcome {
    transform_citation_operation_within(op, conflicting, CITATION_PROXIMITY)
}

/// Transforms a citation operation against an already-applied operation.
///
/// - Text edits overlapping the citation span flag `text-citation-overlap`;
///   a text delete covering the whole span flags `citation-deleted`.
/// - Citation edits on the same `citationId` flag deletion, update or
///   duplicate insertion. An update newer than `op` overwrites its
///   reference and text.
/// - Different citations within `proximity` flag a position conflict; the
///   newer one moves past the other's text plus one separator.
///
/// When the conflicting operation is newer, update/delete labels are
/// relabelled `citation-updated` / `operation-cancelled` and `op` is voided.
pub fn transform_citation_operation_within(
    op: &Operation,
    conflicting: &Operation,
    proximity: i64,
) -> TransformOutcome {
    let Some(citation) = op.citation() else {
        return transform_text_operation(op, conflicting);
    };

    let mut transformed = op.clone();
    let is_delete = matches!(op.kind, OperationKind::CitationDelete(_));
    let is_insert = matches!(op.kind, OperationKind::CitationInsert(_));

    let (conflict, mut cancelled) = match &conflicting.kind {
        OperationKind::CursorMove { .. } => return TransformOutcome::clean(transformed),

        OperationKind::TextInsert { .. }
        | OperationKind::TextDelete { .. }
        | OperationKind::TextFormat { .. } => {
            let start = conflicting.offset();
            let end = start.saturating_add(conflicting.span_len());
            let span_start = op.offset();
            let span_end = span_start.saturating_add(citation.span_len());

            let covered = matches!(conflicting.kind, OperationKind::TextDelete { .. })
                && start <= span_start
                && end >= span_end;
            let overlaps = start < span_end && span_start < end;

            transformed.position = transform_position(&op.position, conflicting);
            if covered {
                (Some(ConflictType::CitationDeleted), is_delete)
            } else if overlaps {
                (Some(ConflictType::TextCitationOverlap), false)
            } else {
                (None, false)
            }
        }

        OperationKind::CitationInsert(other)
        | OperationKind::CitationUpdate(other)
        | OperationKind::CitationDelete(other)
            if other.citation_id == citation.citation_id =>
        {
            match &conflicting.kind {
                OperationKind::CitationDelete(_) => {
                    transformed.position = transform_position(&op.position, conflicting);
                    (Some(ConflictType::CitationDeletedByOther), is_delete)
                }
                OperationKind::CitationInsert(_) => {
                    transformed.position = transform_position(&op.position, conflicting);
                    (Some(ConflictType::DuplicateCitationInsert), is_insert)
                }
                _ => {
                    let label = if other.reference_id != citation.reference_id {
                        ConflictType::CitationUpdatedByOther
                    } else if other.citation_text != citation.citation_text {
                        ConflictType::CitationTextUpdated
                    } else {
                        ConflictType::CitationUpdatedByOther
                    };
                    if conflicting.timestamp >= op.timestamp {
                        adopt_fields(&mut transformed, other);
                    }
                    (Some(label), false)
                }
            }
        }

        OperationKind::CitationInsert(other)
        | OperationKind::CitationUpdate(other)
        | OperationKind::CitationDelete(other) => {
            if (op.offset() - conflicting.offset()).abs() < proximity {
                if op.timestamp > conflicting.timestamp {
                    let target = conflicting
                        .offset()
                        .saturating_add(other.span_len())
                        .saturating_add(1);
                    let moved = target - transformed.position.offset;
                    transformed.position.offset = target;
                    transformed.position.column =
                        transformed.position.column.saturating_add(moved).max(0);
                }
                (Some(ConflictType::CitationPositionConflict), false)
            } else {
                transformed.position = transform_position(&op.position, conflicting);
                (None, false)
            }
        }
    };

    let Some(mut conflict) = conflict else {
        return TransformOutcome::clean(transformed);
    };

    if conflicting.timestamp > op.timestamp {
        conflict = conflict.superseded();
        cancelled |= conflict.voids_operation();
    }

    TransformOutcome::conflicted(transformed, conflict, cancelled)
}

/// Last-writer-wins at the field level: take the newer citation's fields
fn adopt_fields(op: &mut Operation, newer: &CitationFields) {
    if let OperationKind::CitationInsert(c)
    | OperationKind::CitationUpdate(c)
    | OperationKind::CitationDelete(c) = &mut op.kind
    {
        c.reference_id = newer.reference_id.clone();
        c.citation_text = newer.citation_text.clone();
    }
}
