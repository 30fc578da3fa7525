//! Operation composer
//!
//! Collapses bursts of operations from the same user into fewer, equivalent
//! operations: typing runs become one insert, backspace runs one delete,
//! overlapping format spans one format, cursor trails their last move.
//!
//! Citation operations are atomic and never compose.

use chrono::Duration;

use super::operation::{char_len, Operation, OperationKind};

/// Operations further apart than this never compose
pub const COMPOSE_WINDOW_MS: i64 = 5000;

/// Groups same-user, same-type, temporally adjacent operations
#[derive(Debug, Clone, Copy)]
pub struct Composer {
    window: Duration,
}

impl Default for Composer {
    fn default() -> Self {
        Self::with_window_ms(COMPOSE_WINDOW_MS)
    }
}

impl Composer {
    pub fn with_window_ms(window_ms: i64) -> Self {
        Self {
            window: Duration::milliseconds(window_ms),
        }
    }

    /// Composes `ops` after sorting them chronologically.
    ///
    /// Results that end up meaningless (empty insert, zero-length delete)
    /// are dropped.
    pub fn compose(&self, ops: &[Operation]) -> Vec<Operation> {
        let mut sorted = ops.to_vec();
        sorted.sort_by_key(|op| op.timestamp);

        let mut composed = Vec::with_capacity(sorted.len());
        let mut iter = sorted.into_iter();
        let Some(mut current) = iter.next() else {
            return composed;
        };

        for next in iter {
            match self.merge_pair(&current, &next) {
                Some(merged) => current = merged,
                None => composed.push(std::mem::replace(&mut current, next)),
            }
        }
        composed.push(current);

        composed.retain(is_meaningful);
        composed
    }

    fn merge_pair(&self, current: &Operation, next: &Operation) -> Option<Operation> {
        if current.user_id != next.user_id
            || current.document_id != next.document_id
            || current.op_type() != next.op_type()
        {
            return None;
        }
        if next.timestamp - current.timestamp > self.window {
            return None;
        }

        match (&current.kind, &next.kind) {
            (OperationKind::TextInsert { content, .. }, OperationKind::TextInsert { .. }) => {
                let end = current.offset().saturating_add(char_len(content));
                if (next.offset() - end).abs() > 1 {
                    return None;
                }
                merge_text_inserts(&[current.clone(), next.clone()])
            }

            (OperationKind::TextDelete { length: a }, OperationKind::TextDelete { length: b }) => {
                if (next.offset() - current.offset()).abs() > a.saturating_add(*b) {
                    return None;
                }
                let start = if next.offset() < current.offset() { next } else { current };
                let mut merged = current.clone();
                merged.position = start.position;
                merged.kind = OperationKind::TextDelete {
                    length: a.saturating_add(*b),
                };
                merged.timestamp = next.timestamp;
                Some(merged)
            }

            (
                OperationKind::TextFormat {
                    length: a,
                    formatting: fa,
                },
                OperationKind::TextFormat {
                    length: b,
                    formatting: fb,
                },
            ) => {
                let (start_a, end_a) = (current.offset(), current.offset().saturating_add(*a));
                let (start_b, end_b) = (next.offset(), next.offset().saturating_add(*b));
                if start_b > end_a || start_a > end_b {
                    return None;
                }
                let start = if start_b < start_a { next } else { current };
                let mut merged = current.clone();
                merged.position = start.position;
                merged.kind = OperationKind::TextFormat {
                    length: end_a.max(end_b) - start_a.min(start_b),
                    formatting: fa.union(fb),
                };
                merged.timestamp = next.timestamp;
                Some(merged)
            }

            (OperationKind::CursorMove { .. }, OperationKind::CursorMove { new_position }) => {
                let mut merged = current.clone();
                merged.kind = OperationKind::CursorMove {
                    new_position: *new_position,
                };
                merged.timestamp = next.timestamp;
                Some(merged)
            }

            _ => None,
        }
    }
}

/// Composes `ops` with the default window
pub fn compose_operations(ops: &[Operation]) -> Vec<Operation> {
    Composer::default().compose(ops)
}

/// Concatenates text inserts in ascending timestamp order.
///
/// The result keeps the envelope and position of the earliest insert and
/// the timestamp of the latest. Returns `None` if `ops` is empty or holds
/// anything but text inserts.
pub fn merge_text_inserts(ops: &[Operation]) -> Option<Operation> {
    let mut sorted: Vec<&Operation> = ops.iter().collect();
    sorted.sort_by_key(|op| op.timestamp);

    let first = *sorted.first()?;
    let last = *sorted.last()?;
    let mut text = String::new();
    for op in &sorted {
        match &op.kind {
            OperationKind::TextInsert { content, .. } => text.push_str(content),
            _ => return None,
        }
    }

    let formatting = match &first.kind {
        OperationKind::TextInsert { formatting, .. } => *formatting,
        _ => None,
    };

    let mut merged = first.clone();
    merged.kind = OperationKind::TextInsert {
        content: text,
        formatting,
    };
    merged.timestamp = last.timestamp;
    Some(merged)
}

fn is_meaningful(op: &Operation) -> bool {
    match &op.kind {
        OperationKind::TextInsert { content, .. } => !content.is_empty(),
        OperationKind::TextDelete { length } => *length != 0,
        OperationKind::TextFormat { length, formatting } => *length != 0 && !formatting.is_empty(),
        _ => true,
    }
}
