//! Record and value error types

use thiserror::Error;

use super::types::AttType;

/// Result type for record operations
pub type RecordResult<T> = Result<T, RecordError>;

/// Errors raised while building, mutating, or decoding records
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("Type mismatch for attribute '{att}': slot is {expected}, value is {found}")]
    TypeMismatch {
        att: String,
        expected: AttType,
        found: AttType,
    },

    #[error("Slot {index} out of range for schema with {len} attributes")]
    SlotOutOfRange { index: usize, len: usize },

    #[error("Record image truncated: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("Invalid UTF-8 in string attribute '{0}'")]
    InvalidUtf8(String),

    #[error("Invalid {ty} literal: {text}")]
    InvalidLiteral { ty: AttType, text: String },

    #[error("Operator '{op}' not defined for {left} and {right}")]
    UnsupportedOperands {
        op: &'static str,
        left: AttType,
        right: AttType,
    },
}
