//! Executor error types
//!
//! Error codes:
//! - REL_EXECUTION_FAILED (ERROR)
//! - REL_INVALID_EXPRESSION (FATAL)
//! - REL_ARITY_MISMATCH (ERROR)
//! - REL_JOIN_KEY_MISMATCH (ERROR)
//! - REL_STORAGE_FAILED (ERROR)
//! - REL_DATA_CORRUPTION (FATAL)
//!
//! Lower-layer errors convert with `From` so operators propagate them with `?`.

use std::fmt;

use crate::expr::ExprError;
use crate::index::IndexError;
use crate::record::RecordError;
use crate::storage::StorageError;

/// Severity levels for executor errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation failed but inputs are intact
    Error,
    /// Caller must stop: the request or the data is unusable
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Executor-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorErrorCode {
    /// General execution failure (e.g. a runtime value error)
    RelExecutionFailed,
    /// An expression failed to parse, resolve or type-check
    RelInvalidExpression,
    /// Output sink arity does not match what the operator produces
    RelArityMismatch,
    /// Join keys have types that cannot be compared
    RelJoinKeyMismatch,
    /// Page store or index operation failed
    RelStorageFailed,
    /// Stored data failed validation (FATAL)
    RelDataCorruption,
}

impl ExecutorErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            ExecutorErrorCode::RelExecutionFailed => "REL_EXECUTION_FAILED",
            ExecutorErrorCode::RelInvalidExpression => "REL_INVALID_EXPRESSION",
            ExecutorErrorCode::RelArityMismatch => "REL_ARITY_MISMATCH",
            ExecutorErrorCode::RelJoinKeyMismatch => "REL_JOIN_KEY_MISMATCH",
            ExecutorErrorCode::RelStorageFailed => "REL_STORAGE_FAILED",
            ExecutorErrorCode::RelDataCorruption => "REL_DATA_CORRUPTION",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            ExecutorErrorCode::RelDataCorruption | ExecutorErrorCode::RelInvalidExpression => {
                Severity::Fatal
            }
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for ExecutorErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Executor error type with full context
#[derive(Debug)]
pub struct ExecutorError {
    code: ExecutorErrorCode,
    message: String,
    /// Operator or phase the error was raised in
    context: Option<String>,
}

impl ExecutorError {
    fn new(code: ExecutorErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
        }
    }

    /// Create an execution failed error
    pub fn execution_failed(reason: impl Into<String>) -> Self {
        Self::new(ExecutorErrorCode::RelExecutionFailed, reason)
    }

    /// Create an invalid expression error (FATAL)
    pub fn invalid_expression(reason: impl Into<String>) -> Self {
        Self::new(ExecutorErrorCode::RelInvalidExpression, reason)
    }

    /// Output sink has `found` attributes but the operator produces `expected`
    pub fn arity_mismatch(expected: usize, found: usize) -> Self {
        Self::new(
            ExecutorErrorCode::RelArityMismatch,
            format!(
                "output sink has {} attributes, operator produces {}",
                found, expected
            ),
        )
    }

    /// Create a join key mismatch error
    pub fn join_key_mismatch(reason: impl Into<String>) -> Self {
        Self::new(ExecutorErrorCode::RelJoinKeyMismatch, reason)
    }

    /// Create a data corruption error (FATAL)
    pub fn data_corruption(reason: impl Into<String>) -> Self {
        Self::new(ExecutorErrorCode::RelDataCorruption, reason)
    }

    /// Attaches the operator or phase the error surfaced in
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Returns the error code
    pub fn code(&self) -> ExecutorErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the context if set
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref context) = self.context {
            write!(f, " (in {})", context)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExecutorError {}

impl From<StorageError> for ExecutorError {
    fn from(err: StorageError) -> Self {
        let code = if err.is_fatal() {
            ExecutorErrorCode::RelDataCorruption
        } else {
            ExecutorErrorCode::RelStorageFailed
        };
        Self::new(code, err.to_string())
    }
}

impl From<IndexError> for ExecutorError {
    fn from(err: IndexError) -> Self {
        let code = if err.is_fatal() {
            ExecutorErrorCode::RelDataCorruption
        } else {
            ExecutorErrorCode::RelStorageFailed
        };
        Self::new(code, err.to_string())
    }
}

impl From<ExprError> for ExecutorError {
    fn from(err: ExprError) -> Self {
        match err {
            ExprError::Value(RecordError::InvalidLiteral { .. }) => {
                Self::invalid_expression(err.to_string())
            }
            // Raised while evaluating against live records
            ExprError::Value(inner) => Self::from(inner),
            ExprError::Unbound { .. } => Self::execution_failed(err.to_string()),
            other => Self::invalid_expression(other.to_string()),
        }
    }
}

impl From<RecordError> for ExecutorError {
    fn from(err: RecordError) -> Self {
        Self::execution_failed(err.to_string())
    }
}

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;
