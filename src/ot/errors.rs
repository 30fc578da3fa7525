//! # OT Errors
//!
//! Error types for the operational transformation core.

use thiserror::Error;

/// Result type for OT operations
pub type OtResult<T> = Result<T, OtError>;

/// Errors raised by the pure OT functions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OtError {
    /// Operation envelope or payload is malformed
    #[error("Invalid operation format: {0}")]
    InvalidOperationFormat(String),

    /// Operation addresses text outside the document
    #[error("Offset {offset} (+{length}) out of bounds for content of length {content_length}")]
    OutOfBounds {
        offset: i64,
        length: i64,
        content_length: usize,
    },
}

impl OtError {
    /// Create an invalid format error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidOperationFormat(msg.into())
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            OtError::InvalidOperationFormat(_) => "INVALID_OPERATION_FORMAT",
            OtError::OutOfBounds { .. } => "OUT_OF_BOUNDS",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(OtError::invalid("x").code(), "INVALID_OPERATION_FORMAT");
        let err = OtError::OutOfBounds {
            offset: 9,
            length: 2,
            content_length: 5,
        };
        assert_eq!(err.code(), "OUT_OF_BOUNDS");
        assert!(err.to_string().contains("length 5"));
    }
}
