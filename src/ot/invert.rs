//! Operation inverter
//!
//! Builds the operation that undoes another. An operation alone does not
//! carry what it overwrote, so [`invert_operation`] substitutes placeholders
//! for deleted text and replaced citation fields. [`invert_with_pre_image`]
//! uses the pre-image recorded when the operation was applied and is exact.

use super::apply::PreImage;
use super::operation::{char_len, CitationFields, Operation, OperationKind};

/// Stands in for each character of deleted text that was not recorded
pub const PLACEHOLDER_CHAR: char = '\u{FFFD}';

/// Stands in for citation text replaced by an update that was not recorded
pub const PLACEHOLDER_CITATION_TEXT: &str = "[citation]";

/// Longest placeholder run [`invert_operation`] will build
pub const MAX_PLACEHOLDER_CHARS: i64 = 1 << 20;

/// Inverts `op` without knowledge of what it overwrote.
///
/// - `TEXT_INSERT` becomes a delete of the inserted length.
/// - `TEXT_DELETE` becomes an insert of placeholder characters of the same
///   length, capped at [`MAX_PLACEHOLDER_CHARS`].
/// - `TEXT_FORMAT` flips every flag it set.
/// - `CITATION_INSERT` and `CITATION_DELETE` swap.
/// - `CITATION_UPDATE` restores placeholder text on the same reference.
/// - `CURSOR_MOVE` moves back to where the cursor came from.
pub fn invert_operation(op: &Operation) -> Operation {
    let mut inverse = op.clone();
    inverse.id = inverse_id(op);

    inverse.kind = match &op.kind {
        OperationKind::TextInsert { content, .. } => OperationKind::TextDelete {
            length: char_len(content),
        },
        OperationKind::TextDelete { length } => OperationKind::TextInsert {
            content: placeholder_text(op, *length),
            formatting: None,
        },
        OperationKind::TextFormat { length, formatting } => OperationKind::TextFormat {
            length: *length,
            formatting: formatting.negated(),
        },
        OperationKind::CitationInsert(c) => OperationKind::CitationDelete(c.clone()),
        OperationKind::CitationDelete(c) => OperationKind::CitationInsert(c.clone()),
        OperationKind::CitationUpdate(c) => OperationKind::CitationUpdate(CitationFields {
            citation_id: c.citation_id.clone(),
            citation_text: PLACEHOLDER_CITATION_TEXT.to_string(),
            reference_id: c.reference_id.clone(),
        }),
        OperationKind::CursorMove { new_position } => {
            inverse.position = *new_position;
            OperationKind::CursorMove {
                new_position: op.position,
            }
        }
    };

    inverse
}

/// Inverts `op` using the pre-image captured when it was applied.
///
/// Falls back to [`invert_operation`] when the pre-image is absent or does
/// not fit the operation kind.
pub fn invert_with_pre_image(op: &Operation, pre_image: Option<&PreImage>) -> Operation {
    let mut inverse = invert_operation(op);

    match (&op.kind, pre_image) {
        (OperationKind::TextDelete { .. }, Some(PreImage::DeletedText { text })) => {
            inverse.kind = OperationKind::TextInsert {
                content: text.clone(),
                formatting: None,
            };
        }
        (
            OperationKind::CitationUpdate(c),
            Some(PreImage::Citation {
                citation_text,
                reference_id,
            }),
        ) => {
            inverse.kind = OperationKind::CitationUpdate(CitationFields {
                citation_id: c.citation_id.clone(),
                citation_text: citation_text.clone(),
                reference_id: reference_id.clone(),
            });
        }
        (OperationKind::CitationDelete(c), Some(PreImage::DeletedText { text })) => {
            inverse.kind = OperationKind::CitationInsert(CitationFields {
                citation_text: text.clone(),
                ..c.clone()
            });
        }
        _ => {}
    }

    inverse
}

fn placeholder_text(op: &Operation, length: i64) -> String {
    if length > MAX_PLACEHOLDER_CHARS {
        tracing::warn!(
            operation_id = %op.id,
            length,
            cap = MAX_PLACEHOLDER_CHARS,
            "delete too long to invert in full, placeholder truncated"
        );
    }
    let count = length.clamp(0, MAX_PLACEHOLDER_CHARS) as usize;
    std::iter::repeat(PLACEHOLDER_CHAR).take(count).collect()
}

fn inverse_id(op: &Operation) -> String {
    format!("{}-inverse", op.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ot::apply::apply_operation;
    use crate::ot::operation::{Formatting, Position};

    const USER: &str = "6f1c2a3b-4d5e-4f60-8a7b-9c0d1e2f3a4b";
    const DOC: &str = "0a1b2c3d-4e5f-4a6b-9c7d-8e9f0a1b2c3d";

    fn op(offset: i64, kind: OperationKind) -> Operation {
        Operation::new(USER, DOC, 1, Position::at(offset), kind).with_id("op-7")
    }

    #[test]
    fn test_insert_inverts_to_delete() {
        let insert = op(4, OperationKind::insert("abc"));
        let inverse = invert_operation(&insert);

        assert_eq!(inverse.kind, OperationKind::delete(3));
        assert_eq!(inverse.offset(), 4);
        assert_eq!(inverse.id, "op-7-inverse");
    }

    #[test]
    fn test_insert_then_inverse_restores_content() {
        let original = "The quick fox";
        let insert = op(4, OperationKind::insert("very "));

        let inserted = apply_operation(original, &insert).unwrap();
        let restored = apply_operation(&inserted.content, &invert_operation(&insert)).unwrap();

        assert_eq!(restored.content, original);
    }

    #[test]
    fn test_delete_inverse_uses_placeholder() {
        let inverse = invert_operation(&op(2, OperationKind::delete(3)));
        match inverse.kind {
            OperationKind::TextInsert { content, .. } => {
                assert_eq!(content.chars().count(), 3);
                assert!(content.chars().all(|c| c == PLACEHOLDER_CHAR));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_huge_delete_inverse_is_capped() {
        for length in [1 << 45, i64::MAX] {
            let inverse = invert_operation(&op(0, OperationKind::delete(length)));
            match inverse.kind {
                OperationKind::TextInsert { content, .. } => {
                    assert_eq!(content.chars().count() as i64, MAX_PLACEHOLDER_CHARS);
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_delete_inverse_with_pre_image_is_exact() {
        let delete = op(0, OperationKind::delete(5));
        let applied = apply_operation("Hello World", &delete).unwrap();

        let inverse = invert_with_pre_image(&delete, applied.pre_image.as_ref());
        let restored = apply_operation(&applied.content, &inverse).unwrap();
        assert_eq!(restored.content, "Hello World");
    }

    #[test]
    fn test_citation_insert_delete_swap() {
        let citation = CitationFields::new("c1", "(Smith, 2020)", "r1");
        let insert = op(3, OperationKind::CitationInsert(citation.clone()));

        let inverse = invert_operation(&insert);
        assert_eq!(inverse.kind, OperationKind::CitationDelete(citation.clone()));
        assert_eq!(
            invert_operation(&inverse).kind,
            OperationKind::CitationInsert(citation)
        );
    }

    #[test]
    fn test_citation_update_inverse() {
        let update = op(
            3,
            OperationKind::CitationUpdate(CitationFields::new("c1", "(Smith, 2021)", "r2")),
        );

        let blind = invert_operation(&update);
        assert_eq!(
            blind.citation().unwrap().citation_text,
            PLACEHOLDER_CITATION_TEXT
        );

        let pre_image = PreImage::Citation {
            citation_text: "(Smith, 2020)".to_string(),
            reference_id: "r1".to_string(),
        };
        let exact = invert_with_pre_image(&update, Some(&pre_image));
        let fields = exact.citation().unwrap();
        assert_eq!(fields.citation_text, "(Smith, 2020)");
        assert_eq!(fields.reference_id, "r1");
    }

    #[test]
    fn test_cursor_move_inverse_swaps_positions() {
        let cursor = op(2, OperationKind::cursor(Position::at(9)));
        let inverse = invert_operation(&cursor);

        assert_eq!(inverse.offset(), 9);
        assert_eq!(inverse.kind, OperationKind::cursor(Position::at(2)));
    }

    #[test]
    fn test_format_inverse_negates() {
        let bold = Formatting {
            bold: Some(true),
            ..Default::default()
        };
        let inverse = invert_operation(&op(0, OperationKind::format(4, bold)));
        assert_eq!(
            inverse.kind,
            OperationKind::format(4, Formatting {
                bold: Some(false),
                ..Default::default()
            })
        );
    }
}
