//! Unified error system for the catalog workspace
//!
//! - [`ErrorCode`]: Standardized error codes for all error types
//! - [`AppError`]: Rich error type with codes, messages, and details
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 6xxx: Catalog errors
//! - 7xxx: Import errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode};
//!
//! let err = AppError::new(ErrorCode::CategoryPathEmpty);
//! assert!(!err.is_retryable());
//!
//! let err = AppError::with_message(ErrorCode::CategoryParentInvalid, "parent 42 vanished")
//!     .with_detail("parent_id", 42);
//! assert!(err.is_retryable());
//! ```

mod codes;
mod types;

pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{AppError, AppResult};
