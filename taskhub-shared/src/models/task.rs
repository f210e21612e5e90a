/// Task model and database operations
///
/// A task is created by exactly one user, may be assigned to any number of
/// users and labelled with any number of categories. The two many-to-many
/// relations live in join tables and are always written as a full
/// replacement of the membership set.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high');
/// CREATE TYPE task_status AS ENUM ('pending', 'in_progress', 'completed');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(200) NOT NULL,
///     description TEXT,
///     created_by UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     priority task_priority NOT NULL DEFAULT 'medium',
///     status task_status NOT NULL DEFAULT 'pending',
///     due_date TIMESTAMPTZ NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE task_assignees (
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     PRIMARY KEY (task_id, user_id)
/// );
///
/// CREATE TABLE task_categories (
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     category_id UUID NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
///     PRIMARY KEY (task_id, category_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::category::CategoryRef;
use super::user::{like_pattern, push_page, UserRef};
use crate::auth::authorization::TaskVisibility;
use crate::store::{TaskQuery, TaskSortField};

/// Task priority
///
/// Variant order is rank order; sorting by priority sorts low → high.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "task_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

/// Task progress
///
/// Variant order is rank order: pending → in progress → completed.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            _ => None,
        }
    }
}

/// Base task row
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub status: TaskStatus,
    pub due_date: DateTime<Utc>,

    /// Creator; set from the authenticated actor and never changed afterwards
    pub created_by: Uuid,

    pub created_at: DateTime<Utc>,

    /// Refreshed on every mutation, including relation-only changes
    pub updated_at: DateTime<Utc>,
}

/// A task together with the current state of its relations
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    pub task: Task,
    pub creator: UserRef,

    /// Ordered by username
    pub assignees: Vec<UserRef>,

    /// Ordered by name
    pub categories: Vec<CategoryRef>,
}

impl TaskRecord {
    pub fn is_creator(&self, user_id: Uuid) -> bool {
        self.task.created_by == user_id
    }

    pub fn is_assigned(&self, user_id: Uuid) -> bool {
        self.assignees.iter().any(|user| user.id == user_id)
    }

    pub fn assignee_ids(&self) -> Vec<Uuid> {
        self.assignees.iter().map(|user| user.id).collect()
    }

    pub fn category_ids(&self) -> Vec<Uuid> {
        self.categories.iter().map(|category| category.id).collect()
    }
}

/// Input for creating a task and its relation sets in one write
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub status: TaskStatus,
    pub due_date: DateTime<Utc>,
    pub created_by: Uuid,
    pub assigned_to: Vec<Uuid>,
    pub categories: Vec<Uuid>,
}

/// Input for updating a task
///
/// None leaves a field unchanged. A present relation list replaces the whole
/// membership set.
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,

    /// Use Some(None) to clear
    pub description: Option<Option<String>>,

    pub priority: Option<Priority>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to: Option<Vec<Uuid>>,
    pub categories: Option<Vec<Uuid>>,
}

/// Many-to-many relations of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRelation {
    Assignees,
    Categories,
}

impl TaskRelation {
    fn table(&self) -> &'static str {
        match self {
            TaskRelation::Assignees => "task_assignees",
            TaskRelation::Categories => "task_categories",
        }
    }

    fn member_column(&self) -> &'static str {
        match self {
            TaskRelation::Assignees => "user_id",
            TaskRelation::Categories => "category_id",
        }
    }
}

/// Removes duplicates while keeping first-seen order
pub fn dedup_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut unique = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(id) {
            unique.push(*id);
        }
    }
    unique
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    #[sqlx(flatten)]
    task: Task,
    creator_username: String,
    creator_first_name: String,
    creator_last_name: String,
}

#[derive(sqlx::FromRow)]
struct AssigneeRow {
    task_id: Uuid,
    #[sqlx(flatten)]
    user: UserRef,
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    task_id: Uuid,
    #[sqlx(flatten)]
    category: CategoryRef,
}

const TASK_SELECT: &str = r#"
    SELECT t.id, t.title, t.description, t.priority, t.status, t.due_date,
           t.created_by, t.created_at, t.updated_at,
           u.username AS creator_username,
           u.first_name AS creator_first_name,
           u.last_name AS creator_last_name
    FROM tasks t
    JOIN users u ON u.id = t.created_by
"#;

impl Task {
    /// Inserts the base task row
    pub async fn insert(conn: &mut PgConnection, data: &CreateTask) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (title, description, created_by, priority, status, due_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, title, description, priority, status, due_date,
                      created_by, created_at, updated_at
            "#,
        )
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.created_by)
        .bind(data.priority)
        .bind(data.status)
        .bind(data.due_date)
        .fetch_one(conn)
        .await
    }

    /// Updates scalar columns and refreshes `updated_at`
    ///
    /// Takes the row lock that serializes concurrent relation replacements on
    /// the same task. Returns false when the task doesn't exist.
    pub async fn update_row(
        conn: &mut PgConnection,
        id: Uuid,
        data: &UpdateTask,
    ) -> Result<bool, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE tasks SET updated_at = NOW()");

        if let Some(title) = &data.title {
            builder.push(", title = ").push_bind(title.clone());
        }
        if let Some(description) = &data.description {
            builder.push(", description = ").push_bind(description.clone());
        }
        if let Some(priority) = data.priority {
            builder.push(", priority = ").push_bind(priority);
        }
        if let Some(status) = data.status {
            builder.push(", status = ").push_bind(status);
        }
        if let Some(due_date) = data.due_date {
            builder.push(", due_date = ").push_bind(due_date);
        }

        builder.push(" WHERE id = ").push_bind(id);

        let result = builder.build().execute(conn).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Sets a relation to exactly `ids`
    ///
    /// Diffs against the stored membership: rows absent from `ids` are
    /// removed, missing rows inserted. Must run inside the transaction that
    /// holds the task row lock.
    pub async fn replace_relation(
        conn: &mut PgConnection,
        task_id: Uuid,
        relation: TaskRelation,
        ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        let ids = dedup_ids(ids);
        let table = relation.table();
        let column = relation.member_column();

        sqlx::query(&format!(
            "DELETE FROM {table} WHERE task_id = $1 AND NOT ({column} = ANY($2))"
        ))
        .bind(task_id)
        .bind(&ids)
        .execute(&mut *conn)
        .await?;

        sqlx::query(&format!(
            "INSERT INTO {table} (task_id, {column})
             SELECT $1, member FROM UNNEST($2::uuid[]) AS member
             ON CONFLICT DO NOTHING"
        ))
        .bind(task_id)
        .bind(&ids)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Loads a task with its relations
    pub async fn find_record(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<TaskRecord>, sqlx::Error> {
        let row = sqlx::query_as::<_, TaskRow>(&format!("{TASK_SELECT} WHERE t.id = $1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => Ok(Self::attach_relations(conn, vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Lists tasks matching `query`
    ///
    /// The visibility predicate is part of the WHERE clause, so search,
    /// filters and pagination only ever see rows the actor may read.
    pub async fn list_records(
        pool: &PgPool,
        query: &TaskQuery,
    ) -> Result<Vec<TaskRecord>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(TASK_SELECT);
        builder.push(" WHERE TRUE");

        if let TaskVisibility::Involving(user_id) = query.visibility {
            builder
                .push(" AND (t.created_by = ")
                .push_bind(user_id)
                .push(" OR EXISTS (SELECT 1 FROM task_assignees va WHERE va.task_id = t.id AND va.user_id = ")
                .push_bind(user_id)
                .push("))");
        }
        if let Some(status) = query.status {
            builder.push(" AND t.status = ").push_bind(status);
        }
        if let Some(priority) = query.priority {
            builder.push(" AND t.priority = ").push_bind(priority);
        }
        if let Some(category_id) = query.category {
            builder
                .push(" AND EXISTS (SELECT 1 FROM task_categories fc WHERE fc.task_id = t.id AND fc.category_id = ")
                .push_bind(category_id)
                .push(")");
        }
        if let Some(user_id) = query.assigned_to {
            builder
                .push(" AND EXISTS (SELECT 1 FROM task_assignees fa WHERE fa.task_id = t.id AND fa.user_id = ")
                .push_bind(user_id)
                .push(")");
        }
        if let Some(user_id) = query.created_by {
            builder.push(" AND t.created_by = ").push_bind(user_id);
        }
        if let Some(pattern) = query.search.as_deref().map(like_pattern) {
            builder
                .push(" AND (t.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR t.description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        let column = match query.ordering.field {
            TaskSortField::CreatedAt => "t.created_at",
            TaskSortField::DueDate => "t.due_date",
            TaskSortField::Priority => "t.priority",
            TaskSortField::Status => "t.status",
        };
        let direction = if query.ordering.descending { "DESC" } else { "ASC" };
        builder.push(format!(" ORDER BY {column} {direction}, t.created_at DESC, t.id"));
        push_page(&mut builder, &query.page);

        let mut conn = pool.acquire().await?;
        let rows = builder
            .build_query_as::<TaskRow>()
            .fetch_all(&mut *conn)
            .await?;

        Self::attach_relations(&mut conn, rows).await
    }

    /// Deletes a task; its comments and relation rows cascade
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn attach_relations(
        conn: &mut PgConnection,
        rows: Vec<TaskRow>,
    ) -> Result<Vec<TaskRecord>, sqlx::Error> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|row| row.task.id).collect();

        let assignees = sqlx::query_as::<_, AssigneeRow>(
            r#"
            SELECT ta.task_id, u.id, u.username, u.first_name, u.last_name
            FROM task_assignees ta
            JOIN users u ON u.id = ta.user_id
            WHERE ta.task_id = ANY($1)
            ORDER BY u.username, u.id
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;

        let categories = sqlx::query_as::<_, CategoryRow>(
            r#"
            SELECT tc.task_id, c.id, c.name
            FROM task_categories tc
            JOIN categories c ON c.id = tc.category_id
            WHERE tc.task_id = ANY($1)
            ORDER BY c.name, c.id
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;

        let records = rows
            .into_iter()
            .map(|row| {
                let task_id = row.task.id;
                TaskRecord {
                    creator: UserRef {
                        id: row.task.created_by,
                        username: row.creator_username,
                        first_name: row.creator_first_name,
                        last_name: row.creator_last_name,
                    },
                    assignees: assignees
                        .iter()
                        .filter(|a| a.task_id == task_id)
                        .map(|a| a.user.clone())
                        .collect(),
                    categories: categories
                        .iter()
                        .filter(|c| c.task_id == task_id)
                        .map(|c| c.category.clone())
                        .collect(),
                    task: row.task,
                }
            })
            .collect();

        Ok(records)
    }
}
