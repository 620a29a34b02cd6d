//! Category Path Resolver
//!
//! Turns an ordered list of level names into a materialized chain of
//! categories and returns the id of the deepest node.

use shared::error::{AppError, ErrorCode};
use shared::models::{CategoryId, CategoryPath, CategoryType};
use thiserror::Error;

use crate::db::repository::{CategorySession, CategoryStore, RepoError};

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ResolveError {
    /// No usable level after trimming and dropping blanks
    #[error("Category path has no non-blank levels")]
    EmptyPath,

    /// Parent missing or of another type at creation time
    #[error("Invalid parent: {0}")]
    InvalidParent(String),

    #[error("Category store unavailable: {0}")]
    StoreUnavailable(String),

    /// Stored `level` disagrees with the node's depth from its root
    #[error("Category {id} has level {actual}, expected {expected}")]
    LevelMismatch {
        id: CategoryId,
        expected: i32,
        actual: i32,
    },

    #[error(transparent)]
    Store(RepoError),
}

impl ResolveError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::EmptyPath => ErrorCode::CategoryPathEmpty,
            Self::InvalidParent(_) => ErrorCode::CategoryParentInvalid,
            Self::StoreUnavailable(_) => ErrorCode::StoreUnavailable,
            Self::LevelMismatch { .. } => ErrorCode::CategoryLevelMismatch,
            Self::Store(RepoError::NotFound(_)) => ErrorCode::CategoryNotFound,
            Self::Store(RepoError::Duplicate(_)) => ErrorCode::CategoryNameExists,
            Self::Store(RepoError::Validation(_)) => ErrorCode::ValidationFailed,
            Self::Store(_) => ErrorCode::DatabaseError,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }
}

impl From<RepoError> for ResolveError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::InvalidParent(msg) => Self::InvalidParent(msg),
            RepoError::Unavailable(msg) => Self::StoreUnavailable(msg),
            other => Self::Store(other),
        }
    }
}

impl From<ResolveError> for AppError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Store(repo) => repo.into(),
            ResolveError::LevelMismatch {
                id,
                expected,
                actual,
            } => AppError::with_message(
                ErrorCode::CategoryLevelMismatch,
                format!("Category {id} has level {actual}, expected {expected}"),
            )
            .with_detail("category_id", id)
            .with_detail("expected_level", expected)
            .with_detail("actual_level", actual),
            other => AppError::with_message(other.code(), other.to_string()),
        }
    }
}

pub type ResolveResult<T> = Result<T, ResolveError>;

// =============================================================================
// Resolver
// =============================================================================

/// Stateless between calls; all state lives in the store.
#[derive(Debug, Clone)]
pub struct CategoryPathResolver<S> {
    store: S,
}

impl<S: CategoryStore> CategoryPathResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolve `levels` (root first) within `category_type`.
    ///
    /// Levels are trimmed and blank ones skipped, so `["A", "", "B"]` resolves
    /// the same chain as `["A", "B"]`. Calling twice with the same levels
    /// returns the same id and creates nothing the second time.
    pub async fn resolve_path<T: AsRef<str>>(
        &self,
        levels: &[T],
        category_type: &CategoryType,
    ) -> ResolveResult<CategoryId> {
        self.resolve(&CategoryPath::new(levels), category_type).await
    }

    /// Resolve a delimited path string such as `"Electronics > Laptops"`
    pub async fn resolve_str(
        &self,
        text: &str,
        delimiter: &str,
        category_type: &CategoryType,
    ) -> ResolveResult<CategoryId> {
        self.resolve(&CategoryPath::parse(text, delimiter), category_type)
            .await
    }

    pub async fn resolve(
        &self,
        path: &CategoryPath,
        category_type: &CategoryType,
    ) -> ResolveResult<CategoryId> {
        if path.is_empty() {
            return Err(ResolveError::EmptyPath);
        }

        // One session (one pooled connection) for the whole walk
        let mut session = self.store.session().await?;

        let mut parent_id: Option<CategoryId> = None;
        for (depth, name) in path.levels().iter().enumerate() {
            let node = session
                .find_or_create_child(name, parent_id, category_type)
                .await?;

            let expected = depth as i32;
            if node.level != expected {
                tracing::error!(
                    category_id = node.id,
                    category_type = %category_type,
                    expected_level = expected,
                    actual_level = node.level,
                    "Category level does not match its depth"
                );
                return Err(ResolveError::LevelMismatch {
                    id: node.id,
                    expected,
                    actual: node.level,
                });
            }
            parent_id = Some(node.id);
        }

        parent_id.ok_or(ResolveError::EmptyPath)
    }
}
