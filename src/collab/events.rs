//! # Collaboration Events
//!
//! Events emitted by the orchestrator for the session layer to fan out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ot::{Operation, OperationError, OperationResult};

/// Event emitted after an operation is processed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum CollabEvent {
    /// Acknowledgement to the submitter
    #[serde(rename_all = "camelCase")]
    OperationConfirmed {
        operation_id: String,
        success: bool,
        new_version: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        transformed_operation: Option<Operation>,
    },

    /// Applied operation, for every other participant
    #[serde(rename_all = "camelCase")]
    OperationBroadcasted {
        operation: Operation,
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        new_version: u64,
        timestamp: DateTime<Utc>,
    },

    /// Rejection or apply failure
    #[serde(rename_all = "camelCase")]
    OperationFailed {
        operation_id: String,
        error: OperationError,
        conflicts: Vec<String>,
    },
}

impl CollabEvent {
    /// Confirmation for a processed operation
    pub fn confirmed(operation_id: impl Into<String>, result: &OperationResult) -> Self {
        CollabEvent::OperationConfirmed {
            operation_id: operation_id.into(),
            success: result.success,
            new_version: result.new_version,
            transformed_operation: result.transformed_operation.clone(),
        }
    }

    /// Broadcast of an applied operation
    pub fn broadcasted(operation: Operation, session_id: Option<String>, new_version: u64) -> Self {
        CollabEvent::OperationBroadcasted {
            operation,
            session_id,
            new_version,
            timestamp: Utc::now(),
        }
    }

    /// Failure of an operation, with any conflicts met before it failed
    pub fn failed(operation_id: impl Into<String>, error: OperationError, conflicts: Vec<String>) -> Self {
        CollabEvent::OperationFailed {
            operation_id: operation_id.into(),
            error,
            conflicts,
        }
    }

    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            CollabEvent::OperationConfirmed { .. } => "operation-confirmed",
            CollabEvent::OperationBroadcasted { .. } => "operation-broadcasted",
            CollabEvent::OperationFailed { .. } => "operation-failed",
        }
    }

    /// Id of the operation the event concerns
    pub fn operation_id(&self) -> &str {
        match self {
            CollabEvent::OperationConfirmed { operation_id, .. }
            | CollabEvent::OperationFailed { operation_id, .. } => operation_id,
            CollabEvent::OperationBroadcasted { operation, .. } => &operation.id,
        }
    }
}
