//! Utilities - logging and error re-exports
//!
//! - [`AppError`] - application error type (from shared::error)
//! - [`logger`] - tracing subscriber setup

pub mod logger;

pub use shared::error::{AppError, AppResult, ErrorCode};
