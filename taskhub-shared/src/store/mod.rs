/// Entity Store interface
///
/// Handlers reach persistent state only through [`EntityStore`]. Two
/// implementations exist:
///
/// - [`postgres::PgStore`]: the production store, backed by sqlx and the
///   models in [`crate::models`]
/// - [`memory::MemoryStore`]: an in-process store with the same semantics,
///   used by the API test suite and for local experiments
///
/// Every task write (base row plus relation sets) is atomic: readers never
/// observe a task whose relations are half replaced.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskhub_shared::store::{memory::MemoryStore, EntityStore, UserQuery};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store: Arc<dyn EntityStore> = Arc::new(MemoryStore::new());
/// let users = store.list_users(&UserQuery::default()).await?;
/// assert!(users.is_empty());
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::authorization::TaskVisibility;
use crate::models::category::{Category, CreateCategory, UpdateCategory};
use crate::models::comment::{CommentRecord, CreateComment};
use crate::models::task::{CreateTask, Priority, TaskRecord, TaskRelation, TaskStatus, UpdateTask};
use crate::models::user::{CreateUser, UpdateUser, User};

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write
    #[error("{field} already exists")]
    UniqueViolation { field: &'static str },

    /// The write referenced a row that doesn't exist
    #[error("{field} references a missing record")]
    InvalidReference { field: &'static str },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Limit/offset window applied after filtering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Page {
    /// Applies the window to an already filtered and ordered sequence
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let offset = self.offset.unwrap_or(0).max(0) as usize;
        let iter = items.into_iter().skip(offset);
        match self.limit {
            Some(limit) => iter.take(limit.max(0) as usize).collect(),
            None => iter.collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    /// Case-insensitive substring over username, email, first and last name
    pub search: Option<String>,
    pub page: Page,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryQuery {
    /// Case-insensitive substring over name and description
    pub search: Option<String>,
    pub page: Page,
}

#[derive(Debug, Clone, Default)]
pub struct CommentQuery {
    pub task: Option<Uuid>,
    pub page: Page,
}

/// Columns a task list can be ordered by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskSortField {
    #[default]
    CreatedAt,
    DueDate,
    Priority,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskOrdering {
    pub field: TaskSortField,
    pub descending: bool,
}

impl Default for TaskOrdering {
    /// Newest first
    fn default() -> Self {
        TaskOrdering {
            field: TaskSortField::CreatedAt,
            descending: true,
        }
    }
}

impl TaskOrdering {
    /// Parses `field` or `-field`
    pub fn parse(value: &str) -> Option<Self> {
        let (descending, name) = match value.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, value),
        };

        let field = match name {
            "created_at" => TaskSortField::CreatedAt,
            "due_date" => TaskSortField::DueDate,
            "priority" => TaskSortField::Priority,
            "status" => TaskSortField::Status,
            _ => return None,
        };

        Some(TaskOrdering { field, descending })
    }
}

/// Task collection query
///
/// Always carries the actor's visibility predicate; every other filter is
/// combined with it conjunctively before ordering and pagination.
#[derive(Debug, Clone)]
pub struct TaskQuery {
    pub visibility: TaskVisibility,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub category: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub created_by: Option<Uuid>,

    /// Case-insensitive substring over title and description
    pub search: Option<String>,

    pub ordering: TaskOrdering,
    pub page: Page,
}

impl TaskQuery {
    pub fn new(visibility: TaskVisibility) -> Self {
        TaskQuery {
            visibility,
            status: None,
            priority: None,
            category: None,
            assigned_to: None,
            created_by: None,
            search: None,
            ordering: TaskOrdering::default(),
            page: Page::default(),
        }
    }
}

/// Persistent state of users, categories, tasks and comments
///
/// `get_*` return `Ok(None)` for unknown ids; `update_*` likewise. `delete_*`
/// return whether a row was removed.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Checks that the backing store is reachable
    async fn ping(&self) -> StoreResult<()>;

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn list_users(&self, query: &UserQuery) -> StoreResult<Vec<User>>;
    async fn create_user(&self, data: CreateUser) -> StoreResult<User>;
    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>>;

    /// Cascades to the user's created tasks and authored comments
    async fn delete_user(&self, id: Uuid) -> StoreResult<bool>;

    /// Returns the ids in `ids` that don't resolve to a user
    async fn missing_user_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Uuid>>;

    async fn get_category(&self, id: Uuid) -> StoreResult<Option<Category>>;
    async fn list_categories(&self, query: &CategoryQuery) -> StoreResult<Vec<Category>>;
    async fn create_category(&self, data: CreateCategory) -> StoreResult<Category>;
    async fn update_category(&self, id: Uuid, data: UpdateCategory)
        -> StoreResult<Option<Category>>;
    async fn delete_category(&self, id: Uuid) -> StoreResult<bool>;
    async fn missing_category_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Uuid>>;

    /// Loads a task with the relation state current at call time
    async fn get_task(&self, id: Uuid) -> StoreResult<Option<TaskRecord>>;
    async fn list_tasks(&self, query: &TaskQuery) -> StoreResult<Vec<TaskRecord>>;

    /// Creates the task and both relation sets in one transaction
    async fn create_task(&self, data: CreateTask) -> StoreResult<TaskRecord>;

    /// Updates the task, replacing any relation set that is present, in one
    /// transaction. Always refreshes `updated_at`.
    async fn update_task(&self, id: Uuid, data: UpdateTask) -> StoreResult<Option<TaskRecord>>;

    /// Cascades to the task's comments
    async fn delete_task(&self, id: Uuid) -> StoreResult<bool>;

    /// Sets a relation of a task to exactly `ids`
    async fn replace_task_relation(
        &self,
        id: Uuid,
        relation: TaskRelation,
        ids: &[Uuid],
    ) -> StoreResult<Option<TaskRecord>>;

    async fn get_comment(&self, id: Uuid) -> StoreResult<Option<CommentRecord>>;

    /// Comments in creation order
    async fn list_comments(&self, query: &CommentQuery) -> StoreResult<Vec<CommentRecord>>;
    async fn create_comment(&self, data: CreateComment) -> StoreResult<CommentRecord>;
    async fn update_comment(&self, id: Uuid, content: String)
        -> StoreResult<Option<CommentRecord>>;
    async fn delete_comment(&self, id: Uuid) -> StoreResult<bool>;
}
