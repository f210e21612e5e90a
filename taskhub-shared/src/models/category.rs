/// Category model and database operations
///
/// Categories label tasks. They have no owner; only managers and admins may
/// create or change them.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE categories (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL,
///     description TEXT,
///     color VARCHAR(7) NOT NULL DEFAULT '#007bff'
/// );
/// ```

use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::user::{like_pattern, push_page};
use crate::store::CategoryQuery;

/// Display color used when none is supplied
pub const DEFAULT_COLOR: &str = "#007bff";

/// Task category
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,

    /// Hex color code, `#RRGGBB`
    pub color: String,
}

impl Category {
    pub fn as_ref_name(&self) -> CategoryRef {
        CategoryRef {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Category identity and name, as referenced from tasks
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CategoryRef {
    pub id: Uuid,
    pub name: String,
}

/// Input for creating a category
#[derive(Debug, Clone)]
pub struct CreateCategory {
    pub name: String,
    pub description: Option<String>,
    pub color: String,
}

/// Input for updating a category; None fields are left unchanged
#[derive(Debug, Clone, Default)]
pub struct UpdateCategory {
    pub name: Option<String>,

    /// Use Some(None) to clear
    pub description: Option<Option<String>>,

    pub color: Option<String>,
}

impl Category {
    pub async fn create(
        executor: impl PgExecutor<'_>,
        data: CreateCategory,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, description, color)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, color
            "#,
        )
        .bind(data.name)
        .bind(data.description)
        .bind(data.color)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name, description, color FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Lists categories ordered by name
    pub async fn list(pool: &PgPool, query: &CategoryQuery) -> Result<Vec<Self>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT id, name, description, color FROM categories");

        if let Some(pattern) = query.search.as_deref().map(like_pattern) {
            builder
                .push(" WHERE (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        builder.push(" ORDER BY name, id");
        push_page(&mut builder, &query.page);

        builder.build_query_as::<Category>().fetch_all(pool).await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateCategory,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE categories SET ");
        let mut columns = builder.separated(", ");

        // Rewriting the id keeps the statement valid when nothing else changes.
        columns.push("id = id");
        if let Some(name) = data.name {
            columns.push("name = ").push_bind_unseparated(name);
        }
        if let Some(description) = data.description {
            columns.push("description = ").push_bind_unseparated(description);
        }
        if let Some(color) = data.color {
            columns.push("color = ").push_bind_unseparated(color);
        }

        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING id, name, description, color");

        builder.build_query_as::<Category>().fetch_optional(pool).await
    }

    /// Deletes a category; tasks keep existing and simply lose the label
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Returns the subset of `ids` that do not resolve to a category
    pub async fn missing_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Uuid>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let found: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM categories WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(pool)
            .await?;

        Ok(ids.iter().filter(|id| !found.contains(id)).copied().collect())
    }
}
