//! Shared types for the catalog workspace
//!
//! Domain models (categories, paths, import mappings) and the unified
//! error system used by the engine and by any consumer of it.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{AppError, AppResult, ErrorCode};
pub use models::{Category, CategoryId, CategoryPath, CategoryType};
