//! Unified error codes for the catalog workspace
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 6xxx: Catalog (category hierarchy) errors
//! - 7xxx: Import errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for compact serialization
/// in import reports and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Validation failed
    ValidationFailed = 2,

    // ==================== 6xxx: Catalog ====================
    /// Category not found
    CategoryNotFound = 6101,
    /// A sibling with the same name already exists
    CategoryNameExists = 6103,
    /// Category path has no usable levels
    CategoryPathEmpty = 6104,
    /// Referenced parent category does not exist
    CategoryParentInvalid = 6105,
    /// Stored level disagrees with the parent chain
    CategoryLevelMismatch = 6106,
    /// Parent chain contains a cycle
    CategoryCycleDetected = 6107,

    // ==================== 7xxx: Import ====================
    /// Field mapping is invalid
    ImportMappingInvalid = 7001,
    /// Row did not finish within the per-row timeout
    ImportRowTimeout = 7002,
    /// Import source could not be read
    ImportSourceInvalid = 7003,

    // ==================== 9xxx: System ====================
    /// Database error
    DatabaseError = 9002,
    /// Backing store unreachable
    StoreUnavailable = 9006,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Whether the same operation may succeed if simply attempted again
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::CategoryParentInvalid
                | ErrorCode::ImportRowTimeout
                | ErrorCode::StoreUnavailable
        )
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::ValidationFailed => "Validation failed",

            // Catalog
            ErrorCode::CategoryNotFound => "Category not found",
            ErrorCode::CategoryNameExists => "Category name already exists under this parent",
            ErrorCode::CategoryPathEmpty => "Category path has no non-blank levels",
            ErrorCode::CategoryParentInvalid => "Parent category does not exist",
            ErrorCode::CategoryLevelMismatch => "Category level does not match its parent chain",
            ErrorCode::CategoryCycleDetected => "Category parent chain contains a cycle",

            // Import
            ErrorCode::ImportMappingInvalid => "Import field mapping is invalid",
            ErrorCode::ImportRowTimeout => "Import row timed out",
            ErrorCode::ImportSourceInvalid => "Import source could not be read",

            // System
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::StoreUnavailable => "Category store is unavailable",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            2 => Ok(ErrorCode::ValidationFailed),

            // Catalog
            6101 => Ok(ErrorCode::CategoryNotFound),
            6103 => Ok(ErrorCode::CategoryNameExists),
            6104 => Ok(ErrorCode::CategoryPathEmpty),
            6105 => Ok(ErrorCode::CategoryParentInvalid),
            6106 => Ok(ErrorCode::CategoryLevelMismatch),
            6107 => Ok(ErrorCode::CategoryCycleDetected),

            // Import
            7001 => Ok(ErrorCode::ImportMappingInvalid),
            7002 => Ok(ErrorCode::ImportRowTimeout),
            7003 => Ok(ErrorCode::ImportSourceInvalid),

            // System
            9002 => Ok(ErrorCode::DatabaseError),
            9006 => Ok(ErrorCode::StoreUnavailable),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::ValidationFailed.code(), 2);
        assert_eq!(ErrorCode::CategoryPathEmpty.code(), 6104);
        assert_eq!(ErrorCode::CategoryParentInvalid.code(), 6105);
        assert_eq!(ErrorCode::ImportRowTimeout.code(), 7002);
        assert_eq!(ErrorCode::StoreUnavailable.code(), 9006);
    }

    #[test]
    fn test_try_from_roundtrip_known_codes() {
        for code in [
            ErrorCode::ValidationFailed,
            ErrorCode::CategoryNameExists,
            ErrorCode::CategoryLevelMismatch,
            ErrorCode::ImportMappingInvalid,
        ] {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
        assert_eq!(ErrorCode::try_from(4242), Err(InvalidErrorCode(4242)));
        assert_eq!(ErrorCode::try_from(0), Err(InvalidErrorCode(0)));
    }

    #[test]
    fn test_retryable() {
        assert!(ErrorCode::StoreUnavailable.is_retryable());
        assert!(ErrorCode::CategoryParentInvalid.is_retryable());
        assert!(ErrorCode::ImportRowTimeout.is_retryable());
        assert!(!ErrorCode::CategoryPathEmpty.is_retryable());
        assert!(!ErrorCode::CategoryLevelMismatch.is_retryable());
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&ErrorCode::CategoryPathEmpty).unwrap();
        assert_eq!(json, "6104");
        let code: ErrorCode = serde_json::from_str("9006").unwrap();
        assert_eq!(code, ErrorCode::StoreUnavailable);
        assert!(serde_json::from_str::<ErrorCode>("1234").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorCode::CategoryPathEmpty.to_string(), "E6104");
        assert_eq!(ErrorCode::ValidationFailed.to_string(), "E0002");
    }
}
