//! Operation validator
//!
//! Structural and semantic well-formedness checks run before any side
//! effect. Validation is pure: it looks only at the operation's fields, so
//! the same input always yields the same verdict.
//!
//! Rejected:
//! - missing `id`, `userId` or `documentId`
//! - `userId` / `documentId` not shaped like a UUID
//! - negative offset, line or column
//! - `TEXT_INSERT` without content
//! - negative lengths, empty citation ids, negative cursor targets

use std::sync::LazyLock;

use regex::Regex;

use super::errors::{OtError, OtResult};
use super::operation::{Operation, OperationKind, Position};

static UUID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
        .expect("UUID pattern is a valid regex")
});

/// Whether `value` looks like a version 1-5 UUID
pub fn is_uuid(value: &str) -> bool {
    UUID_PATTERN.is_match(value)
}

/// Validates an operation.
///
/// # Errors
///
/// Returns `OtError::InvalidOperationFormat` describing the first rule the
/// operation breaks.
pub fn validate(op: &Operation) -> OtResult<()> {
    if op.id.is_empty() {
        return Err(OtError::invalid("missing operation id"));
    }
    if op.user_id.is_empty() {
        return Err(OtError::invalid("missing userId"));
    }
    if op.document_id.is_empty() {
        return Err(OtError::invalid("missing documentId"));
    }
    if !is_uuid(&op.user_id) {
        return Err(OtError::invalid(format!(
            "userId '{}' is not a UUID",
            op.user_id
        )));
    }
    if !is_uuid(&op.document_id) {
        return Err(OtError::invalid(format!(
            "documentId '{}' is not a UUID",
            op.document_id
        )));
    }

    validate_position("position", &op.position)?;

    match &op.kind {
        OperationKind::TextInsert { content, .. } => {
            if content.is_empty() {
                return Err(OtError::invalid("TEXT_INSERT requires non-empty content"));
            }
        }
        OperationKind::TextDelete { length } | OperationKind::TextFormat { length, .. } => {
            if *length < 0 {
                return Err(OtError::invalid(format!(
                    "{} length must not be negative (got {})",
                    op.op_type(),
                    length
                )));
            }
        }
        OperationKind::CitationInsert(citation)
        | OperationKind::CitationUpdate(citation)
        | OperationKind::CitationDelete(citation) => {
            if citation.citation_id.is_empty() {
                return Err(OtError::invalid(format!(
                    "{} requires a citationId",
                    op.op_type()
                )));
            }
        }
        OperationKind::CursorMove { new_position } => {
            validate_position("newPosition", new_position)?;
        }
    }

    Ok(())
}

/// Boolean form of [`validate`]
pub fn is_valid(op: &Operation) -> bool {
    validate(op).is_ok()
}

fn validate_position(field: &str, position: &Position) -> OtResult<()> {
    if position.offset < 0 {
        return Err(OtError::invalid(format!("{field}.offset must be >= 0")));
    }
    if position.line < 0 {
        return Err(OtError::invalid(format!("{field}.line must be >= 0")));
    }
    if position.column < 0 {
        return Err(OtError::invalid(format!("{field}.column must be >= 0")));
    }
    Ok(())
}
