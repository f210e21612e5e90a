/// Task comment model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE task_comments (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     content TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::user::{push_page, UserRef};
use crate::store::CommentQuery;

/// A comment left on a task
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub task_id: Uuid,

    /// Author; set from the authenticated actor
    pub user_id: Uuid,

    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A comment together with its author's name fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRecord {
    pub comment: Comment,
    pub author: UserRef,
}

/// Input for creating a comment
#[derive(Debug, Clone)]
pub struct CreateComment {
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    #[sqlx(flatten)]
    comment: Comment,
    author_username: String,
    author_first_name: String,
    author_last_name: String,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        CommentRecord {
            author: UserRef {
                id: row.comment.user_id,
                username: row.author_username,
                first_name: row.author_first_name,
                last_name: row.author_last_name,
            },
            comment: row.comment,
        }
    }
}

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.task_id, c.user_id, c.content, c.created_at,
           u.username AS author_username,
           u.first_name AS author_first_name,
           u.last_name AS author_last_name
    FROM task_comments c
    JOIN users u ON u.id = c.user_id
"#;

impl Comment {
    /// Inserts a comment and returns it with its author
    ///
    /// # Errors
    ///
    /// Fails with a foreign key violation when the task or author is gone.
    pub async fn create(pool: &PgPool, data: CreateComment) -> Result<CommentRecord, sqlx::Error> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO task_comments (task_id, user_id, content)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(data.task_id)
        .bind(data.user_id)
        .bind(data.content)
        .fetch_one(pool)
        .await?;

        Self::find_record(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_record(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<Option<CommentRecord>, sqlx::Error> {
        let row = sqlx::query_as::<_, CommentRow>(&format!("{COMMENT_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(row.map(CommentRecord::from))
    }

    /// Lists comments oldest first, optionally for one task only
    pub async fn list_records(
        pool: &PgPool,
        query: &CommentQuery,
    ) -> Result<Vec<CommentRecord>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(COMMENT_SELECT);

        if let Some(task_id) = query.task {
            builder.push(" WHERE c.task_id = ").push_bind(task_id);
        }

        builder.push(" ORDER BY c.created_at, c.id");
        push_page(&mut builder, &query.page);

        let rows = builder.build_query_as::<CommentRow>().fetch_all(pool).await?;
        Ok(rows.into_iter().map(CommentRecord::from).collect())
    }

    /// Replaces the content of a comment; task and author never change
    pub async fn update_content(
        pool: &PgPool,
        id: Uuid,
        content: String,
    ) -> Result<Option<CommentRecord>, sqlx::Error> {
        let result = sqlx::query("UPDATE task_comments SET content = $2 WHERE id = $1")
            .bind(id)
            .bind(content)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Self::find_record(pool, id).await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM task_comments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
