//! Transform pipeline
//!
//! Folds a stale operation through every operation applied since the
//! version it was authored against, producing the operation to apply on
//! top of the current document.

use serde::{Deserialize, Serialize};

use super::operation::Operation;
use super::transform::{transform_against_within, ConflictType, CITATION_PROXIMITY};

/// Order in which missed operations are folded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissedOrdering {
    /// Ascending wall-clock timestamp of the missed operations
    #[default]
    Timestamp,
    /// Ascending persisted version, immune to client clock skew
    Version,
}

/// Everything a fold produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformReport {
    /// The operation rewritten against all missed operations
    pub operation: Operation,
    /// Conflicts met along the way, in fold order
    pub conflicts: Vec<ConflictType>,
    /// Some step voided the operation
    pub cancelled: bool,
}

impl TransformReport {
    /// Conflict labels as wire strings
    pub fn conflict_labels(&self) -> Vec<String> {
        self.conflicts.iter().map(|c| c.as_str().to_string()).collect()
    }
}

/// Configurable fold over missed operations
#[derive(Debug, Clone, Copy)]
pub struct TransformPipeline {
    pub ordering: MissedOrdering,
    pub citation_proximity: i64,
}

impl Default for TransformPipeline {
    fn default() -> Self {
        Self {
            ordering: MissedOrdering::default(),
            citation_proximity: CITATION_PROXIMITY,
        }
    }
}

impl TransformPipeline {
    pub fn new(ordering: MissedOrdering, citation_proximity: i64) -> Self {
        Self {
            ordering,
            citation_proximity,
        }
    }

    /// Folds `new_op` through `missed`.
    ///
    /// `missed` must be the operations already applied with a version
    /// greater than `new_op.version`. After each step the operation is
    /// restamped with the missed operation's version.
    pub fn run(&self, new_op: &Operation, missed: &[Operation]) -> TransformReport {
        let mut ordered: Vec<&Operation> = missed.iter().collect();
        match self.ordering {
            MissedOrdering::Timestamp => ordered.sort_by_key(|op| op.timestamp),
            MissedOrdering::Version => ordered.sort_by_key(|op| op.version),
        }

        let mut operation = new_op.clone();
        let mut conflicts = Vec::new();
        let mut cancelled = false;

        for applied in ordered {
            let outcome = transform_against_within(&operation, applied, self.citation_proximity);
            if let Some(conflict) = outcome.conflict_type {
                conflicts.push(conflict);
            }
            cancelled |= outcome.cancelled;
            operation = outcome.transformed;
            operation.version = applied.version;
        }

        TransformReport {
            operation,
            conflicts,
            cancelled,
        }
    }
}

/// Folds `new_op` through `missed` in timestamp order and returns the
/// rewritten operation.
pub fn transform_operations(new_op: &Operation, missed: &[Operation]) -> Operation {
    TransformPipeline::default().run(new_op, missed).operation
}

/// [`transform_operations`], keeping conflicts and the voided flag
pub fn transform_operations_detailed(new_op: &Operation, missed: &[Operation]) -> TransformReport {
    TransformPipeline::default().run(new_op, missed)
}
