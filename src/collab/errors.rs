//! # Collaboration Errors
//!
//! Error types for the apply pipeline and the stores it depends on.

use thiserror::Error;

use crate::ot::{OperationType, OtError};

/// Result type for store calls
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for collaboration operations
pub type CollabResult<T> = Result<T, CollabError>;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised by document, delta and permission stores
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No document with this id
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Compare-and-swap lost: stored version moved
    #[error("Version conflict: expected {expected}, found {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    /// A delta already exists for this version
    #[error("Delta for version {version} already exists")]
    DuplicateDelta { version: u64 },

    /// Backend failure
    #[error("Store error: {0}")]
    Backend(String),
}

/// Errors surfaced by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollabError {
    // ==================
    // Rejections (no side effects)
    // ==================
    /// Malformed envelope, offsets or ids
    #[error("Invalid operation format: {0}")]
    InvalidOperationFormat(String),

    /// Submitter may not perform this operation type
    #[error("User {user_id} may not submit {operation_type} on document {document_id}")]
    PermissionDenied {
        user_id: String,
        document_id: String,
        operation_type: OperationType,
    },

    /// Unknown document
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// No applied operation produced this version
    #[error("No delta for version {version} of document {document_id}")]
    DeltaNotFound { document_id: String, version: u64 },

    // ==================
    // Apply failures (nothing written)
    // ==================
    /// Transform, splice or persistence failed. `conflicts` holds the labels
    /// met while transforming, before the failure.
    #[error("Apply failed: {message}")]
    ApplyFailure {
        message: String,
        conflicts: Vec<String>,
    },

    /// Document kept moving under us; resubmit against the latest version
    #[error("Version conflict after {attempts} attempts")]
    VersionConflict { attempts: u32 },
}

/// Errors loading or validating engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(String),

    #[error("Invalid config JSON: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl CollabError {
    /// Stable error code for results and events
    pub fn code(&self) -> &'static str {
        match self {
            CollabError::InvalidOperationFormat(_) => "INVALID_OPERATION_FORMAT",
            CollabError::PermissionDenied { .. } => "PERMISSION_DENIED",
            CollabError::DocumentNotFound(_) => "DOCUMENT_NOT_FOUND",
            CollabError::DeltaNotFound { .. } => "DELTA_NOT_FOUND",
            CollabError::ApplyFailure { .. } => "APPLY_FAILURE",
            CollabError::VersionConflict { .. } => "VERSION_CONFLICT",
        }
    }

    /// Whether the operation was refused before any work was attempted
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            CollabError::InvalidOperationFormat(_)
                | CollabError::PermissionDenied { .. }
                | CollabError::DocumentNotFound(_)
                | CollabError::DeltaNotFound { .. }
        )
    }

    pub fn apply_failure(message: impl Into<String>) -> Self {
        CollabError::ApplyFailure {
            message: message.into(),
            conflicts: Vec::new(),
        }
    }

    /// Attach transform conflicts to an apply failure; other errors are
    /// returned unchanged.
    pub fn with_conflicts(self, labels: Vec<String>) -> Self {
        match self {
            CollabError::ApplyFailure { message, .. } => CollabError::ApplyFailure {
                message,
                conflicts: labels,
            },
            other => other,
        }
    }

    /// Conflicts met before the failure
    pub fn conflicts(&self) -> &[String] {
        match self {
            CollabError::ApplyFailure { conflicts, .. } => conflicts,
            _ => &[],
        }
    }
}

impl From<OtError> for CollabError {
    fn from(e: OtError) -> Self {
        match e {
            OtError::InvalidOperationFormat(msg) => CollabError::InvalidOperationFormat(msg),
            other => CollabError::apply_failure(other.to_string()),
        }
    }
}

impl From<StoreError> for CollabError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DocumentNotFound(id) => CollabError::DocumentNotFound(id),
            other => CollabError::apply_failure(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            CollabError::InvalidOperationFormat("x".into()).code(),
            "INVALID_OPERATION_FORMAT"
        );
        assert_eq!(CollabError::apply_failure("x").code(), "APPLY_FAILURE");
        assert_eq!(
            CollabError::VersionConflict { attempts: 3 }.code(),
            "VERSION_CONFLICT"
        );
    }

    #[test]
    fn test_conversions() {
        let err: CollabError = StoreError::DocumentNotFound("d1".into()).into();
        assert_eq!(err, CollabError::DocumentNotFound("d1".into()));
        assert!(err.is_rejection());

        let err: CollabError = StoreError::Backend("disk".into()).into();
        assert_eq!(err.code(), "APPLY_FAILURE");
        assert!(!err.is_rejection());

        let err: CollabError = OtError::invalid("bad").into();
        assert_eq!(err.code(), "INVALID_OPERATION_FORMAT");
    }

    #[test]
    fn test_apply_failure_keeps_conflicts() {
        let labels = vec!["text-citation-overlap".to_string()];
        let err = CollabError::apply_failure("out of range").with_conflicts(labels.clone());
        assert_eq!(err.conflicts(), labels.as_slice());
        assert_eq!(err.to_string(), "Apply failed: out of range");

        // Rejections carry none
        let err = CollabError::DocumentNotFound("d1".into()).with_conflicts(labels);
        assert!(err.conflicts().is_empty());
    }

    #[test]
    fn test_permission_denied_message() {
        let err = CollabError::PermissionDenied {
            user_id: "u".into(),
            document_id: "d".into(),
            operation_type: OperationType::TextInsert,
        };
        assert!(err.to_string().contains("TEXT_INSERT"));
    }
}
