//! Page store error types
//!
//! Error codes:
//! - REL_STORAGE_IO_ERROR (ERROR severity)
//! - REL_RECORD_TOO_LARGE (ERROR severity)
//! - REL_STALE_LOCATION (ERROR severity)
//! - REL_RECORD_SIZE_CHANGED (ERROR severity)
//! - REL_SCHEMA_MISMATCH (ERROR severity)
//! - REL_DATA_CORRUPTION (FATAL severity)

use std::fmt;
use std::io;

use crate::record::RecordError;

/// Severity levels for storage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, caller may continue
    Error,
    /// Stored data cannot be trusted
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

/// Storage-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    /// Disk I/O failure while saving or loading a table
    RelStorageIoError,
    /// A record image does not fit in an empty page
    RelRecordTooLarge,
    /// A page location names another pool, a released page, or a bad offset
    RelStaleLocation,
    /// An in-place overwrite would change the image length
    RelRecordSizeChanged,
    /// A record appended to a table carries a different schema
    RelSchemaMismatch,
    /// Checksum failure or malformed page contents
    RelDataCorruption,
}

impl StorageErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            StorageErrorCode::RelStorageIoError => "REL_STORAGE_IO_ERROR",
            StorageErrorCode::RelRecordTooLarge => "REL_RECORD_TOO_LARGE",
            StorageErrorCode::RelStaleLocation => "REL_STALE_LOCATION",
            StorageErrorCode::RelRecordSizeChanged => "REL_RECORD_SIZE_CHANGED",
            StorageErrorCode::RelSchemaMismatch => "REL_SCHEMA_MISMATCH",
            StorageErrorCode::RelDataCorruption => "REL_DATA_CORRUPTION",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            StorageErrorCode::RelDataCorruption => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for StorageErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Storage error with context
#[derive(Debug)]
pub struct StorageError {
    code: StorageErrorCode,
    message: String,
    details: Option<String>,
    source: Option<io::Error>,
}

impl StorageError {
    fn new(code: StorageErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Create a new storage I/O error
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            source: Some(source),
            ..Self::new(StorageErrorCode::RelStorageIoError, message)
        }
    }

    /// A record image of `size` bytes cannot fit a page of `page_size` bytes
    pub fn record_too_large(size: usize, page_size: usize) -> Self {
        Self::new(
            StorageErrorCode::RelRecordTooLarge,
            format!(
                "record image of {} bytes does not fit an empty page of {} bytes",
                size, page_size
            ),
        )
    }

    /// Create a stale location error
    pub fn stale_location(message: impl Into<String>) -> Self {
        Self::new(StorageErrorCode::RelStaleLocation, message)
    }

    /// An overwrite tried to replace `old` bytes with `new` bytes
    pub fn size_changed(old: usize, new: usize) -> Self {
        Self::new(
            StorageErrorCode::RelRecordSizeChanged,
            format!("in-place overwrite changes image size from {} to {} bytes", old, new),
        )
    }

    /// Create a schema mismatch error
    pub fn schema_mismatch(table: &str) -> Self {
        Self::new(
            StorageErrorCode::RelSchemaMismatch,
            format!("record schema does not match table '{}'", table),
        )
    }

    /// Create a new data corruption error (FATAL)
    pub fn data_corruption(message: impl Into<String>) -> Self {
        Self::new(StorageErrorCode::RelDataCorruption, message)
    }

    /// Create a data corruption error with page context
    pub fn corruption_at_page(page: usize, reason: impl Into<String>) -> Self {
        Self {
            details: Some(format!("page: {}", page)),
            ..Self::data_corruption(reason)
        }
    }

    /// Returns the error code
    pub fn code(&self) -> StorageErrorCode {
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

    /// Returns additional error details
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Returns whether this error is fatal
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// A stored record image that fails to decode is corrupt data
impl From<RecordError> for StorageError {
    fn from(err: RecordError) -> Self {
        StorageError::data_corruption(format!("malformed record image: {}", err))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(StorageErrorCode::RelStorageIoError.code(), "REL_STORAGE_IO_ERROR");
        assert_eq!(StorageErrorCode::RelRecordTooLarge.code(), "REL_RECORD_TOO_LARGE");
        assert_eq!(StorageErrorCode::RelStaleLocation.code(), "REL_STALE_LOCATION");
        assert_eq!(StorageErrorCode::RelDataCorruption.code(), "REL_DATA_CORRUPTION");
    }

    #[test]
    fn test_only_corruption_is_fatal() {
        assert!(StorageError::data_corruption("checksum mismatch").is_fatal());
        assert!(!StorageError::record_too_large(100, 64).is_fatal());
        assert!(!StorageError::stale_location("foreign pool").is_fatal());
        assert!(!StorageError::size_changed(8, 12).is_fatal());
    }

    #[test]
    fn test_error_display_contains_required_fields() {
        let err = StorageError::corruption_at_page(3, "checksum mismatch");
        let display = format!("{}", err);
        assert!(display.contains("REL_DATA_CORRUPTION"));
        assert!(display.contains("FATAL"));
        assert!(display.contains("checksum mismatch"));
        assert!(display.contains("page: 3"));
    }

    #[test]
    fn test_record_error_is_corruption() {
        let err: StorageError = RecordError::Truncated {
            needed: 8,
            available: 2,
        }
        .into();
        assert_eq!(err.code(), StorageErrorCode::RelDataCorruption);
    }
}
