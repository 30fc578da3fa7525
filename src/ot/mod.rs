//! # Operational Transformation Core
//!
//! Pure, synchronous building blocks for reconciling concurrent edits to a
//! versioned document:
//!
//! - **Operation model**: text, citation and cursor operations in one envelope
//! - **Validator**: well-formedness before any side effect
//! - **Transform**: position, text, citation and cursor transforms
//! - **Pipeline**: fold a stale operation through missed history
//! - **Compose / Invert**: merge bursts, build undo operations
//! - **Resolver**: spatial last-writer-wins over pending batches
//! - **Apply**: splice an operation into content
//!
//! Nothing here performs I/O or reads the clock; the same inputs always
//! produce the same outputs.

pub mod apply;
pub mod compose;
pub mod errors;
pub mod invert;
pub mod operation;
pub mod pipeline;
pub mod position;
pub mod resolver;
pub mod transform;
pub mod validator;

pub use apply::{apply_operation, Applied, PreImage};
pub use compose::{compose_operations, merge_text_inserts, Composer};
pub use errors::{OtError, OtResult};
pub use invert::{invert_operation, invert_with_pre_image};
pub use operation::{
    CitationFields, Formatting, Operation, OperationError, OperationKind, OperationResult,
    OperationType, Position,
};
pub use pipeline::{
    transform_operations, transform_operations_detailed, MissedOrdering, TransformPipeline,
    TransformReport,
};
pub use position::transform_position;
pub use resolver::{resolve_conflicts, resolve_conflicts_within};
pub use transform::{
    transform_against, transform_citation_operation, transform_text_operation, ConflictType,
    TransformOutcome,
};
pub use validator::{is_valid, validate};
