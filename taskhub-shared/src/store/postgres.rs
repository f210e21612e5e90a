/// PostgreSQL implementation of [`EntityStore`]

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{
    CategoryQuery, CommentQuery, EntityStore, StoreError, StoreResult, TaskQuery, UserQuery,
};
use crate::db::pool::health_check;
use crate::models::category::{Category, CreateCategory, UpdateCategory};
use crate::models::comment::{Comment, CommentRecord, CreateComment};
use crate::models::task::{CreateTask, Task, TaskRecord, TaskRelation, UpdateTask};
use crate::models::user::{CreateUser, UpdateUser, User};

/// Entity store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps constraint violations onto the payload field that caused them
fn classify(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        let field = constraint_field(db_err.constraint().unwrap_or_default());

        if db_err.is_unique_violation() {
            return StoreError::UniqueViolation { field };
        }
        if db_err.is_foreign_key_violation() {
            return StoreError::InvalidReference { field };
        }
    }

    StoreError::Database(err)
}

fn constraint_field(constraint: &str) -> &'static str {
    if constraint.contains("username") {
        "username"
    } else if constraint.ends_with("task_id_fkey") {
        "task"
    } else if constraint.starts_with("task_assignees") {
        "assigned_to"
    } else if constraint.starts_with("task_categories") {
        "categories"
    } else if constraint.starts_with("tasks_created_by") {
        "created_by"
    } else {
        "user"
    }
}

#[async_trait]
impl EntityStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(health_check(&self.pool).await?)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_username(&self.pool, username).await?)
    }

    async fn list_users(&self, query: &UserQuery) -> StoreResult<Vec<User>> {
        Ok(User::list(&self.pool, query).await?)
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        User::create(&self.pool, data).await.map_err(classify)
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        User::update(&self.pool, id, data).await.map_err(classify)
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        Ok(User::delete(&self.pool, id).await?)
    }

    async fn missing_user_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Uuid>> {
        Ok(User::missing_ids(&self.pool, ids).await?)
    }

    async fn get_category(&self, id: Uuid) -> StoreResult<Option<Category>> {
        Ok(Category::find_by_id(&self.pool, id).await?)
    }

    async fn list_categories(&self, query: &CategoryQuery) -> StoreResult<Vec<Category>> {
        Ok(Category::list(&self.pool, query).await?)
    }

    async fn create_category(&self, data: CreateCategory) -> StoreResult<Category> {
        Category::create(&self.pool, data).await.map_err(classify)
    }

    async fn update_category(
        &self,
        id: Uuid,
        data: UpdateCategory,
    ) -> StoreResult<Option<Category>> {
        Category::update(&self.pool, id, data).await.map_err(classify)
    }

    async fn delete_category(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Category::delete(&self.pool, id).await?)
    }

    async fn missing_category_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Uuid>> {
        Ok(Category::missing_ids(&self.pool, ids).await?)
    }

    async fn get_task(&self, id: Uuid) -> StoreResult<Option<TaskRecord>> {
        let mut conn = self.pool.acquire().await?;
        Ok(Task::find_record(&mut conn, id).await?)
    }

    async fn list_tasks(&self, query: &TaskQuery) -> StoreResult<Vec<TaskRecord>> {
        Ok(Task::list_records(&self.pool, query).await?)
    }

    async fn create_task(&self, data: CreateTask) -> StoreResult<TaskRecord> {
        let mut tx = self.pool.begin().await?;

        let task = Task::insert(&mut tx, &data).await.map_err(classify)?;
        Task::replace_relation(&mut tx, task.id, TaskRelation::Assignees, &data.assigned_to)
            .await
            .map_err(classify)?;
        Task::replace_relation(&mut tx, task.id, TaskRelation::Categories, &data.categories)
            .await
            .map_err(classify)?;

        let record = Task::find_record(&mut tx, task.id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        tx.commit().await?;

        debug!(task_id = %record.task.id, "Task created");
        Ok(record)
    }

    async fn update_task(&self, id: Uuid, data: UpdateTask) -> StoreResult<Option<TaskRecord>> {
        let mut tx = self.pool.begin().await?;

        if !Task::update_row(&mut tx, id, &data).await.map_err(classify)? {
            return Ok(None);
        }

        if let Some(assignees) = &data.assigned_to {
            Task::replace_relation(&mut tx, id, TaskRelation::Assignees, assignees)
                .await
                .map_err(classify)?;
        }
        if let Some(categories) = &data.categories {
            Task::replace_relation(&mut tx, id, TaskRelation::Categories, categories)
                .await
                .map_err(classify)?;
        }

        let record = Task::find_record(&mut tx, id).await?;
        tx.commit().await?;

        Ok(record)
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Task::delete(&self.pool, id).await?)
    }

    async fn replace_task_relation(
        &self,
        id: Uuid,
        relation: TaskRelation,
        ids: &[Uuid],
    ) -> StoreResult<Option<TaskRecord>> {
        let mut tx = self.pool.begin().await?;

        if !Task::update_row(&mut tx, id, &UpdateTask::default()).await? {
            return Ok(None);
        }

        Task::replace_relation(&mut tx, id, relation, ids)
            .await
            .map_err(classify)?;

        let record = Task::find_record(&mut tx, id).await?;
        tx.commit().await?;

        Ok(record)
    }

    async fn get_comment(&self, id: Uuid) -> StoreResult<Option<CommentRecord>> {
        Ok(Comment::find_record(&self.pool, id).await?)
    }

    async fn list_comments(&self, query: &CommentQuery) -> StoreResult<Vec<CommentRecord>> {
        Ok(Comment::list_records(&self.pool, query).await?)
    }

    async fn create_comment(&self, data: CreateComment) -> StoreResult<CommentRecord> {
        Comment::create(&self.pool, data).await.map_err(classify)
    }

    async fn update_comment(
        &self,
        id: Uuid,
        content: String,
    ) -> StoreResult<Option<CommentRecord>> {
        Ok(Comment::update_content(&self.pool, id, content).await?)
    }

    async fn delete_comment(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Comment::delete(&self.pool, id).await?)
    }
}
