/// Database models for TaskHub
///
/// Each model owns its row type and the SQL that reads and writes it. The
/// [`crate::store`] layer composes these into the operations the API uses.
///
/// # Models
///
/// - `user`: Accounts, roles and credentials
/// - `category`: Labels attached to tasks
/// - `task`: Tasks with their assignee and category relations
/// - `comment`: Comments left on tasks
///
/// # Example
///
/// ```no_run
/// use taskhub_shared::models::category::{Category, CreateCategory, DEFAULT_COLOR};
/// use taskhub_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let category = Category::create(
///     &pool,
///     CreateCategory {
///         name: "Backend".to_string(),
///         description: None,
///         color: DEFAULT_COLOR.to_string(),
///     },
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```

pub mod category;
pub mod comment;
pub mod task;
pub mod user;
