/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Token issuance and refresh
/// - `users`: Accounts, registration and the caller's own profile
/// - `categories`: Task categories
/// - `tasks`: Tasks, with role-scoped visibility
/// - `comments`: Comments on tasks

pub mod auth;
pub mod categories;
pub mod comments;
pub mod health;
pub mod tasks;
pub mod users;

use taskhub_shared::store::Page;

/// Window from `limit` / `offset` query parameters; negatives clamp to zero
pub fn page(limit: Option<i64>, offset: Option<i64>) -> Page {
    Page {
        limit: limit.map(|l| l.max(0)),
        offset: offset.map(|o| o.max(0)),
    }
}
