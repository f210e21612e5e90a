/// User model and database operations
///
/// Users are the actors of the system. Every user carries exactly one [`Role`];
/// the role decides what the authorization engine lets them do.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     username VARCHAR(150) NOT NULL UNIQUE,
///     email VARCHAR(254) NOT NULL DEFAULT '',
///     first_name VARCHAR(150) NOT NULL DEFAULT '',
///     last_name VARCHAR(150) NOT NULL DEFAULT '',
///     role VARCHAR(10) NOT NULL DEFAULT 'employee',
///     profile_picture VARCHAR(512),
///     password_hash VARCHAR(255) NOT NULL,
///     date_joined TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::store::{Page, UserQuery};

/// Permission tier of a user
///
/// A closed tag with no behavior of its own. What each tier may do is decided
/// by the rule table in [`crate::auth::authorization`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access, including user management
    Admin,

    /// Sees and edits every task, manages categories
    Manager,

    /// Sees and edits only the tasks they created or are assigned to
    #[default]
    Employee,
}

impl Role {
    /// Converts role to its stored string form
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Employee => "employee",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Manager => "Manager",
            Role::Employee => "Employee",
        }
    }

    /// Strict parse used for client input
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Role::Admin),
            "manager" => Some(Role::Manager),
            "employee" => Some(Role::Employee),
            _ => None,
        }
    }
}

/// Stored values outside the closed set decode as the least privileged role.
impl From<String> for Role {
    fn from(value: String) -> Self {
        Role::parse(&value).unwrap_or(Role::Employee)
    }
}

/// User account
///
/// `password_hash` is an argon2id PHC string and never leaves the store layer
/// through a read projection.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Unique login handle
    pub username: String,

    /// Email address (may be empty)
    pub email: String,

    /// Given name (may be empty)
    pub first_name: String,

    /// Family name (may be empty)
    pub last_name: String,

    /// Permission tier
    #[sqlx(try_from = "String")]
    pub role: Role,

    /// Optional stored path or URL of the profile picture
    pub profile_picture: Option<String>,

    /// Argon2id password hash
    pub password_hash: String,

    /// When the account was registered
    pub date_joined: DateTime<Utc>,

    /// When the account was last modified
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Name fields only, as referenced from tasks and comments
    pub fn as_ref_name(&self) -> UserRef {
        UserRef {
            id: self.id,
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

/// The slice of a user that other entities need to render display names
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct UserRef {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub profile_picture: Option<String>,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,
}

/// Input for updating an existing user
///
/// All fields are optional. Only non-None fields will be updated.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<Role>,

    /// New picture (use Some(None) to clear)
    pub profile_picture: Option<Option<String>>,

    /// New password hash; None leaves the stored credential untouched
    pub password_hash: Option<String>,
}

impl UpdateUser {
    /// True when no column would change
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.role.is_none()
            && self.profile_picture.is_none()
            && self.password_hash.is_none()
    }
}

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, role, \
                            profile_picture, password_hash, date_joined, updated_at";

impl User {
    /// Inserts a new user
    ///
    /// # Errors
    ///
    /// Fails with a unique violation when the username is taken.
    pub async fn create(
        executor: impl PgExecutor<'_>,
        data: CreateUser,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO users (username, email, first_name, last_name, role, profile_picture, password_hash)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(data.username)
            .bind(data.email)
            .bind(data.first_name)
            .bind(data.last_name)
            .bind(data.role.as_str())
            .bind(data.profile_picture)
            .bind(data.password_hash)
            .fetch_one(executor)
            .await
    }

    /// Finds a user by ID
    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Finds a user by exact username
    pub async fn find_by_username(
        executor: impl PgExecutor<'_>,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");

        sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(executor)
            .await
    }

    /// Lists users ordered by username, optionally narrowed by a search term
    pub async fn list(pool: &PgPool, query: &UserQuery) -> Result<Vec<Self>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users"));

        if let Some(pattern) = query.search.as_deref().map(like_pattern) {
            builder
                .push(" WHERE (username ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR email ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR first_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR last_name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        builder.push(" ORDER BY username");
        push_page(&mut builder, &query.page);

        builder.build_query_as::<User>().fetch_all(pool).await
    }

    /// Updates an existing user
    ///
    /// Only non-None fields in `data` are written; `updated_at` is always
    /// refreshed. Returns None when the user doesn't exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE users SET updated_at = NOW()");

        if let Some(username) = data.username {
            builder.push(", username = ").push_bind(username);
        }
        if let Some(email) = data.email {
            builder.push(", email = ").push_bind(email);
        }
        if let Some(first_name) = data.first_name {
            builder.push(", first_name = ").push_bind(first_name);
        }
        if let Some(last_name) = data.last_name {
            builder.push(", last_name = ").push_bind(last_name);
        }
        if let Some(role) = data.role {
            builder.push(", role = ").push_bind(role.as_str());
        }
        if let Some(picture) = data.profile_picture {
            builder.push(", profile_picture = ").push_bind(picture);
        }
        if let Some(password_hash) = data.password_hash {
            builder.push(", password_hash = ").push_bind(password_hash);
        }

        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(format!(" RETURNING {USER_COLUMNS}"));

        builder.build_query_as::<User>().fetch_optional(pool).await
    }

    /// Deletes a user by ID
    ///
    /// Cascades to the tasks they created and the comments they wrote.
    /// Returns false if the user didn't exist.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Returns the subset of `ids` that do not resolve to a user
    pub async fn missing_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Uuid>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let found: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(pool)
            .await?;

        Ok(ids.iter().filter(|id| !found.contains(id)).copied().collect())
    }
}

/// Wraps a search term for a case-insensitive substring match, escaping LIKE
/// metacharacters.
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

pub(crate) fn push_page(builder: &mut QueryBuilder<'_, Postgres>, page: &Page) {
    if let Some(limit) = page.limit {
        builder.push(" LIMIT ").push_bind(limit);
    }
    if let Some(offset) = page.offset {
        builder.push(" OFFSET ").push_bind(offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_is_strict() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("manager"), Some(Role::Manager));
        assert_eq!(Role::parse("employee"), Some(Role::Employee));
        assert_eq!(Role::parse("Admin"), None);
        assert_eq!(Role::parse("owner"), None);
    }

    #[test]
    fn test_unknown_stored_role_is_least_privileged() {
        assert_eq!(Role::from("superuser".to_string()), Role::Employee);
        assert_eq!(Role::from(String::new()), Role::Employee);
        assert_eq!(Role::from("manager".to_string()), Role::Manager);
    }

    #[test]
    fn test_role_default_and_serde() {
        assert_eq!(Role::default(), Role::Employee);
        assert_eq!(serde_json::to_string(&Role::Manager).unwrap(), "\"manager\"");
        assert_eq!(Role::Admin.label(), "Admin");
    }

    #[test]
    fn test_update_user_default_is_empty() {
        assert!(UpdateUser::default().is_empty());

        let update = UpdateUser {
            first_name: Some("Ada".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("bug"), "%bug%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
