//! Conflict resolver
//!
//! Spatial last-writer-wins over a batch of pending operations. Operations
//! whose offsets lie closer than the conflict window contend; in each
//! contending pair only the one with the strictly later timestamp survives.
//! This is a coarse heuristic, not causal OT.

use super::operation::Operation;

/// Offsets closer than this contend
pub const CONFLICT_WINDOW: i64 = 5;

/// Resolves `ops` with the default window
pub fn resolve_conflicts(ops: &[Operation]) -> Vec<Operation> {
    resolve_conflicts_within(ops, CONFLICT_WINDOW)
}

/// Resolves `ops`, returning survivors ordered by offset.
///
/// An operation is dropped when any other operation within `window` of its
/// offset has a later timestamp. Equal timestamps keep both.
pub fn resolve_conflicts_within(ops: &[Operation], window: i64) -> Vec<Operation> {
    let mut sorted: Vec<&Operation> = ops.iter().collect();
    sorted.sort_by_key(|op| op.offset());

    let mut survivors = Vec::with_capacity(sorted.len());
    for (i, op) in sorted.iter().enumerate() {
        let before = sorted[..i]
            .iter()
            .rev()
            .take_while(|other| op.offset() - other.offset() < window);
        let after = sorted[i + 1..]
            .iter()
            .take_while(|other| other.offset() - op.offset() < window);

        let superseded = before.chain(after).any(|other| other.timestamp > op.timestamp);
        if superseded {
            tracing::debug!(
                operation_id = %op.id,
                offset = op.offset(),
                "dropping operation superseded by a later nearby edit"
            );
        } else {
            survivors.push((*op).clone());
        }
    }
    survivors
}
