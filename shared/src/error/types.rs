//! Application error type

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Application error with structured error code and details
///
/// The error type every layer converts into at its outer boundary:
/// - Standardized error codes via [`ErrorCode`]
/// - Human-readable messages
/// - Optional structured details (ids, names) for logs and import reports
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct AppError {
    /// The error code identifying the type of error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Create a new error with the default message for the error code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add a detail entry to this error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Whether retrying the failed operation may succeed
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    // ==================== Convenience constructors ====================

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::DatabaseError, msg)
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_default_message() {
        let err = AppError::new(ErrorCode::CategoryPathEmpty);
        assert_eq!(err.code, ErrorCode::CategoryPathEmpty);
        assert_eq!(err.message, ErrorCode::CategoryPathEmpty.message());
        assert!(err.details.is_none());
    }

    #[test]
    fn test_with_detail() {
        let err = AppError::with_message(ErrorCode::CategoryParentInvalid, "parent 7 missing")
            .with_detail("parent_id", 7)
            .with_detail("category_type", "vendor");
        let details = err.details.as_ref().unwrap();
        assert_eq!(details.get("parent_id"), Some(&Value::from(7)));
        assert_eq!(details.get("category_type"), Some(&Value::from("vendor")));
        assert_eq!(err.to_string(), "parent 7 missing");
    }

    #[test]
    fn test_database_error_code() {
        let err = AppError::database("disk I/O error");
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "disk I/O error");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retryable_follows_code() {
        assert!(AppError::new(ErrorCode::StoreUnavailable).is_retryable());
        assert!(!AppError::validation("bad").is_retryable());
    }

    #[test]
    fn test_serialize_skips_empty_details() {
        let json = serde_json::to_value(AppError::new(ErrorCode::ImportRowTimeout)).unwrap();
        assert_eq!(json["code"], 7002);
        assert!(json.get("details").is_none());
    }
}
