//! Index error types
//!
//! Error codes:
//! - REL_INDEX_BUILD_FAILED (ERROR)
//! - REL_INDEX_KEY_MISMATCH (ERROR)
//! - REL_DATA_CORRUPTION (FATAL)

use std::fmt;

use crate::record::{AttType, RecordError};

/// Severity levels for index errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, caller may continue
    Error,
    /// Indexed data cannot be trusted
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

/// Index-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexErrorCode {
    /// Index could not be built over the table
    RelIndexBuildFailed,
    /// A range bound cannot be compared with the key type
    RelIndexKeyMismatch,
    /// A row image failed to decode while indexing
    RelDataCorruption,
}

impl IndexErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            IndexErrorCode::RelIndexBuildFailed => "REL_INDEX_BUILD_FAILED",
            IndexErrorCode::RelIndexKeyMismatch => "REL_INDEX_KEY_MISMATCH",
            IndexErrorCode::RelDataCorruption => "REL_DATA_CORRUPTION",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            IndexErrorCode::RelDataCorruption => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for IndexErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Index error type with full context
#[derive(Debug)]
pub struct IndexError {
    code: IndexErrorCode,
    message: String,
}

impl IndexError {
    /// Create an index build failed error
    pub fn build_failed(reason: impl Into<String>) -> Self {
        Self {
            code: IndexErrorCode::RelIndexBuildFailed,
            message: reason.into(),
        }
    }

    /// A bound of type `found` was given for a key of type `key`
    pub fn key_mismatch(key: AttType, found: AttType) -> Self {
        Self {
            code: IndexErrorCode::RelIndexKeyMismatch,
            message: format!("range bound of type {} on {} key", found, key),
        }
    }

    /// Create a data corruption error
    pub fn data_corruption(reason: impl Into<String>) -> Self {
        Self {
            code: IndexErrorCode::RelDataCorruption,
            message: reason.into(),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> IndexErrorCode {
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

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for IndexError {}

impl From<RecordError> for IndexError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::TypeMismatch { .. } => IndexError {
                code: IndexErrorCode::RelIndexKeyMismatch,
                message: err.to_string(),
            },
            other => IndexError::data_corruption(format!("malformed row image: {}", other)),
        }
    }
}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(IndexErrorCode::RelIndexBuildFailed.code(), "REL_INDEX_BUILD_FAILED");
        assert_eq!(IndexErrorCode::RelIndexKeyMismatch.code(), "REL_INDEX_KEY_MISMATCH");
        assert_eq!(IndexErrorCode::RelDataCorruption.code(), "REL_DATA_CORRUPTION");
    }

    #[test]
    fn test_only_corruption_is_fatal() {
        assert!(IndexError::data_corruption("bad image").is_fatal());
        assert!(!IndexError::build_failed("no attribute").is_fatal());
        assert!(!IndexError::key_mismatch(AttType::Int, AttType::String).is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = IndexError::key_mismatch(AttType::Int, AttType::String);
        let display = format!("{}", err);
        assert!(display.contains("REL_INDEX_KEY_MISMATCH"));
        assert!(display.contains("ERROR"));
        assert!(display.contains("string"));
    }
}
