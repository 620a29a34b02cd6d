//! Category Repository (SQLite)

use async_trait::async_trait;
use shared::models::{Category, CategoryId, CategoryType};
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};

use super::{
    CategorySession, CategoryStore, DEFAULT_CONFLICT_RETRY_LIMIT, RepoError, RepoResult,
    normalize_name, validate_type,
};

const COLUMNS: &str = "id, name, category_type, parent_id, level, is_active, created_at";

pub async fn find_by_id(conn: &mut SqliteConnection, id: CategoryId) -> RepoResult<Option<Category>> {
    let category = sqlx::query_as::<_, Category>(&format!(
        "SELECT {COLUMNS} FROM category WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(category)
}

/// Sibling lookup; matches the `idx_category_sibling` expression index
pub async fn find_child(
    conn: &mut SqliteConnection,
    name: &str,
    parent_id: Option<CategoryId>,
    category_type: &CategoryType,
) -> RepoResult<Option<Category>> {
    let name = normalize_name(name)?;
    let category = sqlx::query_as::<_, Category>(&format!(
        "SELECT {COLUMNS} FROM category \
         WHERE category_type = ? AND IFNULL(parent_id, 0) = IFNULL(?, 0) AND name = ? \
         LIMIT 1"
    ))
    .bind(category_type.as_str())
    .bind(parent_id)
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(category)
}

pub async fn create(
    conn: &mut SqliteConnection,
    name: &str,
    parent_id: Option<CategoryId>,
    category_type: &CategoryType,
) -> RepoResult<Category> {
    let name = normalize_name(name)?;
    validate_type(category_type)?;

    let level = match parent_id {
        None => 0,
        Some(pid) => {
            let parent = find_by_id(conn, pid).await?.ok_or_else(|| {
                RepoError::InvalidParent(format!("Parent category {pid} does not exist"))
            })?;
            if parent.category_type != *category_type {
                return Err(RepoError::InvalidParent(format!(
                    "Parent category {pid} belongs to type '{}', not '{}'",
                    parent.category_type, category_type
                )));
            }
            parent.child_level()
        }
    };

    let now = shared::util::now_millis();
    // A concurrent insert of the same sibling surfaces as a UNIQUE violation
    // (RepoError::Duplicate); a parent deleted since the read above surfaces
    // as a FOREIGN KEY violation (RepoError::InvalidParent).
    let id: CategoryId = sqlx::query_scalar(
        "INSERT INTO category (name, category_type, parent_id, level, is_active, created_at) \
         VALUES (?, ?, ?, ?, 1, ?) RETURNING id",
    )
    .bind(name)
    .bind(category_type.as_str())
    .bind(parent_id)
    .bind(level)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok(Category {
        id,
        name: name.to_string(),
        category_type: category_type.clone(),
        parent_id,
        level,
        is_active: true,
        created_at: now,
    })
}

pub async fn list_by_type(
    conn: &mut SqliteConnection,
    category_type: &CategoryType,
) -> RepoResult<Vec<Category>> {
    let categories = sqlx::query_as::<_, Category>(&format!(
        "SELECT {COLUMNS} FROM category WHERE category_type = ? ORDER BY level, id"
    ))
    .bind(category_type.as_str())
    .fetch_all(&mut *conn)
    .await?;
    Ok(categories)
}

pub async fn set_level(conn: &mut SqliteConnection, id: CategoryId, level: i32) -> RepoResult<()> {
    let rows = sqlx::query("UPDATE category SET level = ? WHERE id = ?")
        .bind(level)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Category {id} not found")));
    }
    Ok(())
}

/// SQLite-backed Category Store
#[derive(Clone, Debug)]
pub struct SqliteCategoryStore {
    pool: SqlitePool,
    conflict_retry_limit: u32,
}

impl SqliteCategoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            conflict_retry_limit: DEFAULT_CONFLICT_RETRY_LIMIT,
        }
    }

    /// Clamped to at least one re-read
    pub fn with_conflict_retry_limit(mut self, limit: u32) -> Self {
        self.conflict_retry_limit = limit.max(1);
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl CategoryStore for SqliteCategoryStore {
    type Session = SqliteCategorySession;

    async fn session(&self) -> RepoResult<Self::Session> {
        let conn = self.pool.acquire().await?;
        Ok(SqliteCategorySession {
            conn,
            conflict_retry_limit: self.conflict_retry_limit,
        })
    }
}

/// One pooled connection, returned to the pool on drop
pub struct SqliteCategorySession {
    conn: PoolConnection<Sqlite>,
    conflict_retry_limit: u32,
}

#[async_trait]
impl CategorySession for SqliteCategorySession {
    async fn find_child(
        &mut self,
        name: &str,
        parent_id: Option<CategoryId>,
        category_type: &CategoryType,
    ) -> RepoResult<Option<Category>> {
        find_child(&mut self.conn, name, parent_id, category_type).await
    }

    async fn create(
        &mut self,
        name: &str,
        parent_id: Option<CategoryId>,
        category_type: &CategoryType,
    ) -> RepoResult<Category> {
        create(&mut self.conn, name, parent_id, category_type).await
    }

    async fn get_by_id(&mut self, id: CategoryId) -> RepoResult<Option<Category>> {
        find_by_id(&mut self.conn, id).await
    }

    async fn list_by_type(&mut self, category_type: &CategoryType) -> RepoResult<Vec<Category>> {
        list_by_type(&mut self.conn, category_type).await
    }

    async fn set_level(&mut self, id: CategoryId, level: i32) -> RepoResult<()> {
        set_level(&mut self.conn, id, level).await
    }

    fn conflict_retry_limit(&self) -> u32 {
        self.conflict_retry_limit
    }
}
