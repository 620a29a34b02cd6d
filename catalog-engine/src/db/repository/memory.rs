//! In-memory Category Store
//!
//! Same contract as the SQLite store, guarded by a single mutex. Each
//! operation locks on its own, so find-then-create races between sessions
//! behave like they do against the database.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared::models::{Category, CategoryId, CategoryType};

use super::{
    CategorySession, CategoryStore, DEFAULT_CONFLICT_RETRY_LIMIT, RepoError, RepoResult,
    normalize_name, validate_type,
};

type SiblingKey = (CategoryType, Option<CategoryId>, String);

#[derive(Debug, Default)]
struct MemoryState {
    last_id: CategoryId,
    rows: BTreeMap<CategoryId, Category>,
    siblings: HashMap<SiblingKey, CategoryId>,
}

#[derive(Clone, Debug)]
pub struct MemoryCategoryStore {
    state: Arc<Mutex<MemoryState>>,
    conflict_retry_limit: u32,
}

impl Default for MemoryCategoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCategoryStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            conflict_retry_limit: DEFAULT_CONFLICT_RETRY_LIMIT,
        }
    }

    /// Clamped to at least one re-read
    pub fn with_conflict_retry_limit(mut self, limit: u32) -> Self {
        self.conflict_retry_limit = limit.max(1);
        self
    }

    pub fn len(&self) -> usize {
        self.state.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every row, ordered by id
    pub fn snapshot(&self) -> Vec<Category> {
        self.state.lock().rows.values().cloned().collect()
    }
}

#[async_trait]
impl CategoryStore for MemoryCategoryStore {
    type Session = MemoryCategorySession;

    async fn session(&self) -> RepoResult<Self::Session> {
        Ok(MemoryCategorySession {
            state: Arc::clone(&self.state),
            conflict_retry_limit: self.conflict_retry_limit,
        })
    }
}

pub struct MemoryCategorySession {
    state: Arc<Mutex<MemoryState>>,
    conflict_retry_limit: u32,
}

#[async_trait]
impl CategorySession for MemoryCategorySession {
    async fn find_child(
        &mut self,
        name: &str,
        parent_id: Option<CategoryId>,
        category_type: &CategoryType,
    ) -> RepoResult<Option<Category>> {
        let key = (category_type.clone(), parent_id, normalize_name(name)?.to_string());
        let state = self.state.lock();
        Ok(state
            .siblings
            .get(&key)
            .and_then(|id| state.rows.get(id))
            .cloned())
    }

    async fn create(
        &mut self,
        name: &str,
        parent_id: Option<CategoryId>,
        category_type: &CategoryType,
    ) -> RepoResult<Category> {
        let name = normalize_name(name)?;
        validate_type(category_type)?;

        let mut state = self.state.lock();
        let level = match parent_id {
            None => 0,
            Some(pid) => {
                let parent = state.rows.get(&pid).ok_or_else(|| {
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

        let key = (category_type.clone(), parent_id, name.to_string());
        if state.siblings.contains_key(&key) {
            return Err(RepoError::Duplicate(format!(
                "'{name}' under parent {parent_id:?} ({category_type})"
            )));
        }

        state.last_id += 1;
        let category = Category {
            id: state.last_id,
            name: name.to_string(),
            category_type: category_type.clone(),
            parent_id,
            level,
            is_active: true,
            created_at: shared::util::now_millis(),
        };
        state.siblings.insert(key, category.id);
        state.rows.insert(category.id, category.clone());
        Ok(category)
    }

    async fn get_by_id(&mut self, id: CategoryId) -> RepoResult<Option<Category>> {
        Ok(self.state.lock().rows.get(&id).cloned())
    }

    async fn list_by_type(&mut self, category_type: &CategoryType) -> RepoResult<Vec<Category>> {
        let mut categories: Vec<Category> = self
            .state
            .lock()
            .rows
            .values()
            .filter(|c| c.category_type == *category_type)
            .cloned()
            .collect();
        categories.sort_by_key(|c| (c.level, c.id));
        Ok(categories)
    }

    async fn set_level(&mut self, id: CategoryId, level: i32) -> RepoResult<()> {
        let mut state = self.state.lock();
        let row = state
            .rows
            .get_mut(&id)
            .ok_or_else(|| RepoError::NotFound(format!("Category {id} not found")))?;
        row.level = level;
        Ok(())
    }

    fn conflict_retry_limit(&self) -> u32 {
        self.conflict_retry_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_find() {
        let store = MemoryCategoryStore::new();
        let mut session = store.session().await.unwrap();
        let store_type = CategoryType::Store;

        let root = session.create("Kitchen", None, &store_type).await.unwrap();
        let child = session.create("Knives", Some(root.id), &store_type).await.unwrap();
        assert_eq!((root.level, child.level), (0, 1));
        assert_eq!(
            session
                .find_child("Knives ", Some(root.id), &store_type)
                .await
                .unwrap()
                .map(|c| c.id),
            Some(child.id)
        );
        assert!(
            session
                .find_child("knives", Some(root.id), &store_type)
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_and_invalid_parent() {
        let store = MemoryCategoryStore::new();
        let mut session = store.session().await.unwrap();
        let vendor = CategoryType::Vendor;

        session.create("Kitchen", None, &vendor).await.unwrap();
        assert!(matches!(
            session.create("Kitchen", None, &vendor).await,
            Err(RepoError::Duplicate(_))
        ));
        assert!(matches!(
            session.create("Knives", Some(77), &vendor).await,
            Err(RepoError::InvalidParent(_))
        ));
        assert!(matches!(
            session.create("  ", None, &vendor).await,
            Err(RepoError::Validation(_))
        ));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_sessions_share_state() {
        let store = MemoryCategoryStore::new();
        let mut a = store.session().await.unwrap();
        let mut b = store.session().await.unwrap();

        let created = a.find_or_create_child("Shared", None, &CategoryType::Vendor).await.unwrap();
        let found = b.find_or_create_child("Shared", None, &CategoryType::Vendor).await.unwrap();
        assert_eq!(created.id, found.id);
        assert_eq!(store.snapshot().len(), 1);
    }

    // Session whose first lookup misses, as if a concurrent caller inserted
    // the sibling between our find and our create
    struct LateSession {
        inner: MemoryCategorySession,
        hide_next_find: bool,
    }

    #[async_trait]
    impl CategorySession for LateSession {
        async fn find_child(
            &mut self,
            name: &str,
            parent_id: Option<CategoryId>,
            category_type: &CategoryType,
        ) -> RepoResult<Option<Category>> {
            if std::mem::take(&mut self.hide_next_find) {
                return Ok(None);
            }
            self.inner.find_child(name, parent_id, category_type).await
        }

        async fn create(
            &mut self,
            name: &str,
            parent_id: Option<CategoryId>,
            category_type: &CategoryType,
        ) -> RepoResult<Category> {
            self.inner.create(name, parent_id, category_type).await
        }

        async fn get_by_id(&mut self, id: CategoryId) -> RepoResult<Option<Category>> {
            self.inner.get_by_id(id).await
        }

        async fn list_by_type(&mut self, ty: &CategoryType) -> RepoResult<Vec<Category>> {
            self.inner.list_by_type(ty).await
        }

        async fn set_level(&mut self, id: CategoryId, level: i32) -> RepoResult<()> {
            self.inner.set_level(id, level).await
        }

        fn conflict_retry_limit(&self) -> u32 {
            0
        }
    }

    #[tokio::test]
    async fn test_lost_race_rereads_even_with_zero_limit() {
        let store = MemoryCategoryStore::new().with_conflict_retry_limit(0);
        let winner = store
            .session()
            .await
            .unwrap()
            .create("Garden", None, &CategoryType::Store)
            .await
            .unwrap();

        let mut late = LateSession {
            inner: store.session().await.unwrap(),
            hide_next_find: true,
        };
        let found = late
            .find_or_create_child("Garden", None, &CategoryType::Store)
            .await
            .unwrap();
        assert_eq!(found.id, winner.id);
        assert!(!late.hide_next_find);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_zero_limit_is_clamped() {
        let store = MemoryCategoryStore::new().with_conflict_retry_limit(0);
        let session = store.session().await.unwrap();
        assert_eq!(session.conflict_retry_limit(), 1);
    }
}
