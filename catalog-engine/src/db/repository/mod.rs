//! Repository Module
//!
//! The Category Store: durable persistence and lookup of category nodes,
//! partitioned by type. Two implementations share one contract:
//!
//! - [`SqliteCategoryStore`]: SQLite, sibling uniqueness enforced by a
//!   UNIQUE index, one pooled connection per session
//! - [`MemoryCategoryStore`]: in-process, mutex-guarded

pub mod category;
pub mod memory;

pub use category::{SqliteCategorySession, SqliteCategoryStore};
pub use memory::{MemoryCategorySession, MemoryCategoryStore};

use async_trait::async_trait;
use shared::error::{AppError, ErrorCode};
use shared::models::{Category, CategoryId, CategoryType};
use thiserror::Error;

/// Re-reads allowed after losing a sibling-creation race
pub const DEFAULT_CONFLICT_RETRY_LIMIT: u32 = 3;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// Sibling uniqueness violated; resolved by re-reading inside
    /// [`CategorySession::find_or_create_child`]
    #[error("Duplicate sibling: {0}")]
    Duplicate(String),

    #[error("Invalid parent: {0}")]
    InvalidParent(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// SQLite primary result codes that mean "try again later"
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Duplicate(db.message().to_string())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                RepoError::InvalidParent(db.message().to_string())
            }
            sqlx::Error::Database(db) => {
                let primary = db
                    .code()
                    .and_then(|c| c.parse::<i32>().ok())
                    .map(|c| c & 0xff);
                match primary {
                    Some(SQLITE_BUSY) | Some(SQLITE_LOCKED) => {
                        RepoError::Unavailable(db.message().to_string())
                    }
                    _ => RepoError::Database(err.to_string()),
                }
            }
            sqlx::Error::RowNotFound => RepoError::NotFound(err.to_string()),
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::WorkerCrashed => RepoError::Unavailable(err.to_string()),
            _ => RepoError::Database(err.to_string()),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => AppError::with_message(ErrorCode::CategoryNotFound, msg),
            RepoError::Duplicate(msg) => {
                AppError::with_message(ErrorCode::CategoryNameExists, msg)
            }
            RepoError::InvalidParent(msg) => {
                AppError::with_message(ErrorCode::CategoryParentInvalid, msg)
            }
            RepoError::Validation(msg) => AppError::validation(msg),
            RepoError::Unavailable(msg) => {
                AppError::with_message(ErrorCode::StoreUnavailable, msg)
            }
            RepoError::Database(msg) => {
                tracing::error!(target: "database", error = %msg, "Database error occurred");
                AppError::database(msg)
            }
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Trim a node name; blank names are rejected
pub fn normalize_name(name: &str) -> RepoResult<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RepoError::Validation("Category name must not be blank".into()));
    }
    Ok(trimmed)
}

pub(crate) fn validate_type(category_type: &CategoryType) -> RepoResult<()> {
    if category_type.as_str().is_empty() {
        return Err(RepoError::Validation("Category type must not be blank".into()));
    }
    Ok(())
}

/// Source of [`CategorySession`]s
///
/// A session is the unit of acquisition: one `resolve_path` call holds one
/// session from its first lookup to its last insert and releases it on drop.
#[async_trait]
pub trait CategoryStore: Send + Sync {
    type Session: CategorySession;

    async fn session(&self) -> RepoResult<Self::Session>;
}

/// Operations on the category table within one acquired session
#[async_trait]
pub trait CategorySession: Send {
    /// Exact (case-preserving, trimmed) name match among the direct children
    /// of `parent_id`, or among roots when `parent_id` is `None`
    async fn find_child(
        &mut self,
        name: &str,
        parent_id: Option<CategoryId>,
        category_type: &CategoryType,
    ) -> RepoResult<Option<Category>>;

    /// Insert a node with `level` derived from its parent.
    ///
    /// Fails with `InvalidParent` when the parent is missing or belongs to
    /// another type, and with `Duplicate` when the sibling already exists.
    async fn create(
        &mut self,
        name: &str,
        parent_id: Option<CategoryId>,
        category_type: &CategoryType,
    ) -> RepoResult<Category>;

    async fn get_by_id(&mut self, id: CategoryId) -> RepoResult<Option<Category>>;

    /// All nodes of one type, ordered by level then id
    async fn list_by_type(&mut self, category_type: &CategoryType) -> RepoResult<Vec<Category>>;

    /// Overwrite the cached level of one node
    async fn set_level(&mut self, id: CategoryId, level: i32) -> RepoResult<()>;

    /// Re-reads allowed after `Duplicate`; never below one
    fn conflict_retry_limit(&self) -> u32 {
        DEFAULT_CONFLICT_RETRY_LIMIT
    }

    /// Race-safe find-or-create.
    ///
    /// A `Duplicate` from `create` means a concurrent caller inserted the same
    /// sibling first: re-read and return the winner's row.
    async fn find_or_create_child(
        &mut self,
        name: &str,
        parent_id: Option<CategoryId>,
        category_type: &CategoryType,
    ) -> RepoResult<Category> {
        let name = normalize_name(name)?;
        let retry_limit = self.conflict_retry_limit().max(1);
        let mut conflicts = 0;
        loop {
            if let Some(existing) = self.find_child(name, parent_id, category_type).await? {
                return Ok(existing);
            }
            match self.create(name, parent_id, category_type).await {
                Ok(created) => {
                    tracing::debug!(
                        category_id = created.id,
                        parent_id = ?parent_id,
                        category_type = %category_type,
                        level = created.level,
                        category_name = name,
                        "Category created"
                    );
                    return Ok(created);
                }
                Err(RepoError::Duplicate(msg)) if conflicts < retry_limit => {
                    conflicts += 1;
                    tracing::debug!(
                        parent_id = ?parent_id,
                        category_type = %category_type,
                        category_name = name,
                        attempt = conflicts,
                        conflict = %msg,
                        "Sibling created concurrently, re-reading"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
}
