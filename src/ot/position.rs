//! Position transform
//!
//! Re-expresses a position in a document that another operation has
//! already altered. Only layout-changing kinds move positions:
//! `TEXT_INSERT`, `TEXT_DELETE`, `CITATION_INSERT`, `CITATION_DELETE`.
//! Formatting, citation updates and cursor moves never do.
//!
//! The offset is exact. Line and column are best effort: deletes do not
//! carry the removed text, so it is taken to be a run of spaces of the
//! deleted length. Such a run holds no line breaks, so a delete only ever
//! moves the column on its own line.

use super::operation::{char_len, Operation, OperationKind, Position};

/// Signed layout change caused by an operation
enum Shift<'a> {
    Insert(&'a str),
    Delete(i64),
}

impl Shift<'_> {
    fn of(op: &Operation) -> Option<Shift<'_>> {
        match &op.kind {
            OperationKind::TextInsert { content, .. } => Some(Shift::Insert(content)),
            OperationKind::CitationInsert(c) => Some(Shift::Insert(&c.citation_text)),
            OperationKind::TextDelete { length } => Some(Shift::Delete(*length)),
            OperationKind::CitationDelete(c) => Some(Shift::Delete(c.span_len())),
            OperationKind::TextFormat { .. }
            | OperationKind::CitationUpdate(_)
            | OperationKind::CursorMove { .. } => None,
        }
    }
}

/// Transforms `pos` against an already-applied `conflicting` operation.
///
/// Positions before the conflicting offset are untouched. At or after it,
/// the offset moves by the inserted length or back by the deleted length,
/// clamped at zero.
pub fn transform_position(pos: &Position, conflicting: &Operation) -> Position {
    let Some(shift) = Shift::of(conflicting) else {
        return *pos;
    };
    if conflicting.position.offset > pos.offset {
        return *pos;
    }

    let anchor = &conflicting.position;
    let same_line = anchor.line == pos.line;

    match shift {
        Shift::Insert(text) => {
            let newlines = count_newlines(text);
            let (line, column) = if newlines > 0 {
                let column = if same_line {
                    tail_len(text).saturating_add((pos.column - anchor.column).max(0))
                } else {
                    pos.column
                };
                (pos.line.saturating_add(newlines), column)
            } else if same_line {
                (pos.line, pos.column.saturating_add(char_len(text)))
            } else {
                (pos.line, pos.column)
            };
            let offset = pos.offset.saturating_add(char_len(text));
            Position::new(line.max(0), column.max(0), offset.max(0))
        }
        Shift::Delete(length) => {
            let column = if same_line {
                pos.column.saturating_sub(length)
            } else {
                pos.column
            };
            let offset = pos.offset.saturating_sub(length);
            Position::new(pos.line.max(0), column.max(0), offset.max(0))
        }
    }
}

fn count_newlines(text: &str) -> i64 {
    text.chars().filter(|c| *c == '\n').count() as i64
}

/// Characters after the last line break
fn tail_len(text: &str) -> i64 {
    match text.rfind('\n') {
        Some(idx) => char_len(&text[idx + 1..]),
        None => char_len(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ot::operation::{CitationFields, Formatting};

    const USER: &str = "6f1c2a3b-4d5e-4f60-8a7b-9c0d1e2f3a4b";
    const DOC: &str = "0a1b2c3d-4e5f-4a6b-9c7d-8e9f0a1b2c3d";

    fn op_at(position: Position, kind: OperationKind) -> Operation {
        Operation::new(USER, DOC, 1, position, kind)
    }

    #[test]
    fn test_insert_before_shifts_forward() {
        let insert = op_at(Position::new(0, 2, 2), OperationKind::insert("abc"));
        let pos = transform_position(&Position::new(0, 5, 5), &insert);

        assert_eq!(pos, Position::new(0, 8, 8));
    }

    #[test]
    fn test_insert_at_same_offset_shifts() {
        let insert = op_at(Position::at(5), OperationKind::insert("xy"));
        assert_eq!(transform_position(&Position::at(5), &insert).offset, 7);
    }

    #[test]
    fn test_insert_after_is_ignored() {
        let insert = op_at(Position::at(9), OperationKind::insert("abc"));
        let pos = Position::new(0, 3, 3);
        assert_eq!(transform_position(&pos, &insert), pos);
    }

    #[test]
    fn test_delete_shifts_back_and_clamps() {
        let delete = op_at(Position::at(0), OperationKind::delete(5));
        assert_eq!(transform_position(&Position::at(8), &delete).offset, 3);
        assert_eq!(transform_position(&Position::at(2), &delete).offset, 0);
    }

    #[test]
    fn test_delete_keeps_line() {
        let delete = op_at(Position::new(2, 3, 30), OperationKind::delete(4));
        assert_eq!(
            transform_position(&Position::new(2, 9, 36), &delete),
            Position::new(2, 5, 32)
        );
        assert_eq!(
            transform_position(&Position::new(4, 9, 60), &delete),
            Position::new(4, 9, 56)
        );
    }

    #[test]
    fn test_huge_delete_clamps_without_allocating() {
        let delete = op_at(Position::at(1), OperationKind::delete(1 << 45));
        assert_eq!(transform_position(&Position::at(3), &delete), Position::new(0, 0, 0));

        let delete = op_at(Position::at(1), OperationKind::delete(i64::MAX));
        assert_eq!(transform_position(&Position::at(3), &delete).offset, 0);
    }

    #[test]
    fn test_insert_near_i64_limit_saturates() {
        let insert = op_at(Position::at(0), OperationKind::insert("ab"));
        let pos = transform_position(&Position::new(0, i64::MAX, i64::MAX), &insert);
        assert_eq!(pos.offset, i64::MAX);
        assert_eq!(pos.column, i64::MAX);
    }

    #[test]
    fn test_multiline_insert_moves_lines() {
        let insert = op_at(Position::new(1, 2, 10), OperationKind::insert("one\ntwo\nxy"));
        let pos = transform_position(&Position::new(1, 6, 14), &insert);

        assert_eq!(pos.line, 3);
        // "xy" tail plus the 4 columns that followed the insertion point
        assert_eq!(pos.column, 6);
        assert_eq!(pos.offset, 24);
    }

    #[test]
    fn test_insert_on_earlier_line_keeps_column() {
        let insert = op_at(Position::new(0, 1, 1), OperationKind::insert("ab"));
        let pos = transform_position(&Position::new(2, 4, 20), &insert);

        assert_eq!(pos, Position::new(2, 4, 22));
    }

    #[test]
    fn test_citation_ops_shift_by_text() {
        let citation = CitationFields::new("c1", "(Lee, 2019)", "r1");
        let insert = op_at(Position::at(0), OperationKind::CitationInsert(citation.clone()));
        let delete = op_at(Position::at(0), OperationKind::CitationDelete(citation));

        assert_eq!(transform_position(&Position::at(4), &insert).offset, 15);
        assert_eq!(transform_position(&Position::at(20), &delete).offset, 9);
    }

    #[test]
    fn test_non_layout_kinds_never_shift() {
        let pos = Position::new(0, 7, 7);
        let kinds = vec![
            OperationKind::format(3, Formatting::default()),
            OperationKind::CitationUpdate(CitationFields::new("c1", "(X)", "r")),
            OperationKind::cursor(Position::at(0)),
        ];
        for kind in kinds {
            let op = op_at(Position::at(0), kind);
            assert_eq!(transform_position(&pos, &op), pos);
        }
    }
}
