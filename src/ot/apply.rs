//! Content application
//!
//! Splices an operation into document content by character index. Only
//! text inserts/deletes and citation inserts/deletes change content; the
//! other kinds leave it untouched.
//!
//! Application is strict: an operation addressing text past the end of the
//! content fails and leaves the content as it was.

use serde::{Deserialize, Serialize};

use super::errors::{OtError, OtResult};
use super::operation::{char_len, Operation, OperationKind};

/// What an operation overwrote, kept so it can be undone exactly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PreImage {
    /// Text removed by a delete
    #[serde(rename_all = "camelCase")]
    DeletedText { text: String },
    /// Citation fields replaced by an update
    #[serde(rename_all = "camelCase")]
    Citation {
        citation_text: String,
        reference_id: String,
    },
}

/// New content plus the removed text, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub content: String,
    pub pre_image: Option<PreImage>,
}

/// Applies `op` to `content`, returning the new content.
///
/// # Errors
///
/// `OtError::OutOfBounds` if the operation's range does not fit inside
/// `content`.
pub fn apply_operation(content: &str, op: &Operation) -> OtResult<Applied> {
    match &op.kind {
        OperationKind::TextInsert { content: text, .. } => {
            insert_at(content, op.offset(), text).map(unchanged_pre_image)
        }
        OperationKind::CitationInsert(citation) => {
            insert_at(content, op.offset(), &citation.citation_text).map(unchanged_pre_image)
        }
        OperationKind::TextDelete { length } => remove_at(content, op.offset(), *length),
        OperationKind::CitationDelete(citation) => {
            let applied = remove_at(content, op.offset(), citation.span_len())?;
            if let Some(PreImage::DeletedText { text }) = &applied.pre_image {
                if text != &citation.citation_text {
                    tracing::warn!(
                        citation_id = %citation.citation_id,
                        expected = %citation.citation_text,
                        found = %text,
                        "citation delete removed text that differs from the citation"
                    );
                }
            }
            Ok(applied)
        }
        OperationKind::TextFormat { .. }
        | OperationKind::CitationUpdate(_)
        | OperationKind::CursorMove { .. } => Ok(Applied {
            content: content.to_string(),
            pre_image: None,
        }),
    }
}

fn unchanged_pre_image(content: String) -> Applied {
    Applied {
        content,
        pre_image: None,
    }
}

fn insert_at(content: &str, offset: i64, text: &str) -> OtResult<String> {
    let at = byte_index(content, offset, 0)?;
    let mut out = String::with_capacity(content.len() + text.len());
    out.push_str(&content[..at]);
    out.push_str(text);
    out.push_str(&content[at..]);
    Ok(out)
}

fn remove_at(content: &str, offset: i64, length: i64) -> OtResult<Applied> {
    let start = byte_index(content, offset, length)?;
    let end_offset = offset
        .checked_add(length)
        .ok_or_else(|| out_of_bounds(content, offset, length))?;
    let end = byte_index(content, end_offset, length)?;
    let removed = content[start..end].to_string();

    let mut out = String::with_capacity(content.len() - removed.len());
    out.push_str(&content[..start]);
    out.push_str(&content[end..]);
    Ok(Applied {
        content: out,
        pre_image: Some(PreImage::DeletedText { text: removed }),
    })
}

fn out_of_bounds(content: &str, offset: i64, length: i64) -> OtError {
    OtError::OutOfBounds {
        offset,
        length,
        content_length: char_len(content) as usize,
    }
}

/// Byte index of character `offset`, allowing one-past-the-end
fn byte_index(content: &str, offset: i64, length: i64) -> OtResult<usize> {
    if offset < 0 || length < 0 {
        return Err(out_of_bounds(content, offset, length));
    }
    let offset = offset as usize;
    if offset == 0 {
        return Ok(0);
    }
    match content.char_indices().nth(offset) {
        Some((idx, _)) => Ok(idx),
        None if offset == content.chars().count() => Ok(content.len()),
        None => Err(out_of_bounds(content, offset as i64, length)),
    }
}
