//! Expression compile and evaluation errors

use thiserror::Error;

use crate::record::RecordError;

/// Result type for expression operations
pub type ExprResult<T> = Result<T, ExprError>;

/// Errors from parsing, compiling, or evaluating an expression
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("Parse error at byte {pos} in '{text}': {reason}")]
    Parse {
        text: String,
        pos: usize,
        reason: String,
    },

    #[error("Unknown attribute [{0}]")]
    UnknownAttribute(String),

    #[error("Operator '{op}' expects {expected} argument(s), got {found}")]
    Arity {
        op: &'static str,
        expected: &'static str,
        found: usize,
    },

    #[error("Operator '{op}' cannot be applied to ({operands})")]
    TypeMismatch { op: &'static str, operands: String },

    #[error("Expression reads record {index} but only {bound} record(s) were bound")]
    Unbound { index: usize, bound: usize },

    #[error(transparent)]
    Value(#[from] RecordError),
}

impl ExprError {
    pub(crate) fn parse(text: &str, pos: usize, reason: impl Into<String>) -> Self {
        ExprError::Parse {
            text: text.to_string(),
            pos,
            reason: reason.into(),
        }
    }
}
