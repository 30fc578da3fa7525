//! Operation Model
//!
//! Every edit submitted to a collaborative document is an [`Operation`]: a
//! common envelope (who, which document, which version it was authored
//! against, when, where) around a closed [`OperationKind`]. Transform
//! functions match the kind exhaustively, so a new kind cannot be added
//! without every transform deciding how to treat it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Location inside a document.
///
/// `offset` is the canonical absolute index (in characters). `line` and
/// `column` are a best-effort 2-D view kept roughly in sync by transforms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub line: i64,
    #[serde(default)]
    pub column: i64,
    pub offset: i64,
}

impl Position {
    pub fn new(line: i64, column: i64, offset: i64) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }

    /// Position at an absolute offset with line/column left at zero
    pub fn at(offset: i64) -> Self {
        Self::new(0, 0, offset)
    }

    /// Derive line and column for `offset` from actual document content.
    ///
    /// Offsets past the end are clamped to the end of the content.
    pub fn from_offset(content: &str, offset: i64) -> Self {
        let offset = offset.max(0);
        let mut line = 0;
        let mut column = 0;
        for (i, c) in content.chars().enumerate() {
            if i as i64 >= offset {
                break;
            }
            if c == '\n' {
                line += 1;
                column = 0;
            } else {
                column += 1;
            }
        }
        Self::new(line, column, offset.min(char_len(content)))
    }
}

/// Inline formatting flags. `None` means "leave as is".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formatting {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
}

impl Formatting {
    /// Union of two formatting sets; flags set in `later` take precedence.
    pub fn union(&self, later: &Formatting) -> Formatting {
        Formatting {
            bold: later.bold.or(self.bold),
            italic: later.italic.or(self.italic),
            underline: later.underline.or(self.underline),
        }
    }

    /// Flip every flag that is set
    pub fn negated(&self) -> Formatting {
        Formatting {
            bold: self.bold.map(|b| !b),
            italic: self.italic.map(|b| !b),
            underline: self.underline.map(|b| !b),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bold.is_none() && self.italic.is_none() && self.underline.is_none()
    }
}

/// Payload shared by all citation operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationFields {
    pub citation_id: String,
    #[serde(default)]
    pub citation_text: String,
    #[serde(default)]
    pub reference_id: String,
}

impl CitationFields {
    pub fn new(
        citation_id: impl Into<String>,
        citation_text: impl Into<String>,
        reference_id: impl Into<String>,
    ) -> Self {
        Self {
            citation_id: citation_id.into(),
            citation_text: citation_text.into(),
            reference_id: reference_id.into(),
        }
    }

    /// Length of the anchored span in characters
    pub fn span_len(&self) -> i64 {
        char_len(&self.citation_text)
    }
}

/// The closed set of operation kinds, discriminated by `type` on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    TextInsert {
        #[serde(default)]
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        formatting: Option<Formatting>,
    },
    TextDelete {
        #[serde(default)]
        length: i64,
    },
    TextFormat {
        #[serde(default)]
        length: i64,
        #[serde(default)]
        formatting: Formatting,
    },
    CitationInsert(CitationFields),
    CitationUpdate(CitationFields),
    CitationDelete(CitationFields),
    #[serde(rename_all = "camelCase")]
    CursorMove { new_position: Position },
}

impl OperationKind {
    pub fn insert(content: impl Into<String>) -> Self {
        Self::TextInsert {
            content: content.into(),
            formatting: None,
        }
    }

    pub fn delete(length: i64) -> Self {
        Self::TextDelete { length }
    }

    pub fn format(length: i64, formatting: Formatting) -> Self {
        Self::TextFormat { length, formatting }
    }

    pub fn cursor(new_position: Position) -> Self {
        Self::CursorMove { new_position }
    }

    /// Discriminant of this kind
    pub fn op_type(&self) -> OperationType {
        match self {
            Self::TextInsert { .. } => OperationType::TextInsert,
            Self::TextDelete { .. } => OperationType::TextDelete,
            Self::TextFormat { .. } => OperationType::TextFormat,
            Self::CitationInsert(_) => OperationType::CitationInsert,
            Self::CitationUpdate(_) => OperationType::CitationUpdate,
            Self::CitationDelete(_) => OperationType::CitationDelete,
            Self::CursorMove { .. } => OperationType::CursorMove,
        }
    }
}

/// Operation discriminant, used for permission checks and grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    TextInsert,
    TextDelete,
    TextFormat,
    CitationInsert,
    CitationUpdate,
    CitationDelete,
    CursorMove,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::TextInsert => "TEXT_INSERT",
            OperationType::TextDelete => "TEXT_DELETE",
            OperationType::TextFormat => "TEXT_FORMAT",
            OperationType::CitationInsert => "CITATION_INSERT",
            OperationType::CitationUpdate => "CITATION_UPDATE",
            OperationType::CitationDelete => "CITATION_DELETE",
            OperationType::CursorMove => "CURSOR_MOVE",
        }
    }

    pub fn is_citation(&self) -> bool {
        matches!(
            self,
            OperationType::CitationInsert
                | OperationType::CitationUpdate
                | OperationType::CitationDelete
        )
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An edit submitted against a specific document version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Opaque operation id
    #[serde(default)]
    pub id: String,

    /// Submitting user (UUID text, checked by the validator)
    #[serde(default)]
    pub user_id: String,

    /// Target document (UUID text, checked by the validator)
    #[serde(default)]
    pub document_id: String,

    /// Version the submitter believed was current
    #[serde(default)]
    pub version: u64,

    pub timestamp: DateTime<Utc>,

    pub position: Position,

    #[serde(flatten)]
    pub kind: OperationKind,
}

impl Operation {
    /// Create an operation with a fresh id, stamped now
    pub fn new(
        user_id: impl Into<String>,
        document_id: impl Into<String>,
        version: u64,
        position: Position,
        kind: OperationKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            document_id: document_id.into(),
            version,
            timestamp: Utc::now(),
            position,
            kind,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn op_type(&self) -> OperationType {
        self.kind.op_type()
    }

    pub fn offset(&self) -> i64 {
        self.position.offset
    }

    pub fn is_text(&self) -> bool {
        matches!(
            self.kind,
            OperationKind::TextInsert { .. }
                | OperationKind::TextDelete { .. }
                | OperationKind::TextFormat { .. }
        )
    }

    pub fn is_citation(&self) -> bool {
        self.op_type().is_citation()
    }

    pub fn citation(&self) -> Option<&CitationFields> {
        match &self.kind {
            OperationKind::CitationInsert(c)
            | OperationKind::CitationUpdate(c)
            | OperationKind::CitationDelete(c) => Some(c),
            _ => None,
        }
    }

    /// Number of characters this operation spans, starting at its offset.
    ///
    /// Inserts span their content, deletes and formats their length,
    /// citations their text. Cursor moves span nothing.
    pub fn span_len(&self) -> i64 {
        match &self.kind {
            OperationKind::TextInsert { content, .. } => char_len(content),
            OperationKind::TextDelete { length } => *length,
            OperationKind::TextFormat { length, .. } => *length,
            OperationKind::CitationInsert(c)
            | OperationKind::CitationUpdate(c)
            | OperationKind::CitationDelete(c) => c.span_len(),
            OperationKind::CursorMove { .. } => 0,
        }
    }
}

/// Structured failure surfaced in an [`OperationResult`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationError {
    pub code: String,
    pub message: String,
}

/// Outcome of submitting an operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transformed_operation: Option<Operation>,
    pub conflicts: Vec<String>,
    pub new_version: u64,
    pub applied_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationError>,
}

impl OperationResult {
    pub fn applied(operation: Operation, conflicts: Vec<String>, new_version: u64) -> Self {
        Self {
            success: true,
            transformed_operation: Some(operation),
            conflicts,
            new_version,
            applied_at: Utc::now(),
            error: None,
        }
    }

    pub fn failed(code: impl Into<String>, message: impl Into<String>, version: u64) -> Self {
        Self {
            success: false,
            transformed_operation: None,
            conflicts: Vec::new(),
            new_version: version,
            applied_at: Utc::now(),
            error: Some(OperationError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// Length of a string in characters, the unit all offsets use
pub fn char_len(s: &str) -> i64 {
    s.chars().count() as i64
}
