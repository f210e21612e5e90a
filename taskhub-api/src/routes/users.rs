/// User endpoints
///
/// # Endpoints
///
/// - `GET /v1/users` - List users (admin)
/// - `POST /v1/users` - Register (anonymous allowed)
/// - `GET /v1/users/me` - The caller's own account
/// - `PUT|PATCH /v1/users/update_profile` - Update the caller's own account
/// - `GET|PUT|PATCH /v1/users/:id` - Admin, or the account itself
/// - `DELETE /v1/users/:id` - Admin
///
/// Only admins may set `role`; for anyone else a submitted role is ignored.

use super::page;
use crate::{
    app::AppState,
    error::{ApiError, ApiJson, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskhub_shared::auth::authorization::{
    authorize, authorize_user_target, require_allow, require_principal, Action, Actor, Resource,
};
use taskhub_shared::models::user::Role;
use taskhub_shared::store::UserQuery;
use taskhub_shared::views::user::{UserPayload, UserView};
use taskhub_shared::views::WriteMode;
use uuid::Uuid;

/// Query parameters for `GET /v1/users`
#[derive(Debug, Default, Deserialize)]
pub struct UserListParams {
    /// Case-insensitive match on username, email, first or last name
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn is_admin(actor: &Actor) -> bool {
    actor.principal().is_some_and(|p| p.role == Role::Admin)
}

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".to_string())
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(params): Query<UserListParams>,
) -> ApiResult<Json<Vec<UserView>>> {
    require_allow(&actor, Resource::User, Action::List)?;

    let query = UserQuery {
        search: params.search.filter(|s| !s.trim().is_empty()),
        page: page(params.limit, params.offset),
    };
    let users = state.store.list_users(&query).await?;

    Ok(Json(users.iter().map(UserView::from).collect()))
}

/// Register a user
///
/// # Endpoint
///
/// ```text
/// POST /v1/users
/// Content-Type: application/json
///
/// {
///   "username": "alice",
///   "password": "SecureP@ss123",
///   "email": "alice@example.com"
/// }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Invalid fields, weak password, taken username
pub async fn create_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiJson(payload): ApiJson<UserPayload>,
) -> ApiResult<(StatusCode, Json<UserView>)> {
    authorize(&actor, Resource::User, Action::Create)?;

    let data = payload.into_create(is_admin(&actor), &state.config.password_hash)?;
    let user = state.store.create_user(data).await?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "Registered user");

    Ok((StatusCode::CREATED, Json(UserView::from(&user))))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<UserView>> {
    let principal = require_principal(&actor)?;

    let user = state
        .store
        .get_user(principal.id)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(UserView::from(&user)))
}

/// Update the caller's own account
///
/// PUT and PATCH both apply partially: any omitted field keeps its value.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiJson(payload): ApiJson<UserPayload>,
) -> ApiResult<Json<UserView>> {
    let principal = require_principal(&actor)?;
    update(state, &actor, principal.id, WriteMode::Partial, payload).await
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserView>> {
    authorize_user_target(&actor, Action::Read, id)?;

    let user = state.store.get_user(id).await?.ok_or_else(user_not_found)?;

    Ok(Json(UserView::from(&user)))
}

async fn update(
    state: AppState,
    actor: &Actor,
    id: Uuid,
    mode: WriteMode,
    payload: UserPayload,
) -> ApiResult<Json<UserView>> {
    authorize_user_target(actor, Action::Update, id)?;

    let data = payload.into_update(mode, is_admin(actor), &state.config.password_hash)?;
    let rehashed = data.password_hash.is_some();

    let user = state
        .store
        .update_user(id, data)
        .await?
        .ok_or_else(user_not_found)?;

    tracing::debug!(user_id = %id, rehashed, "Updated user");

    Ok(Json(UserView::from(&user)))
}

pub async fn replace_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<UserPayload>,
) -> ApiResult<Json<UserView>> {
    update(state, &actor, id, WriteMode::Replace, payload).await
}

pub async fn patch_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<UserPayload>,
) -> ApiResult<Json<UserView>> {
    update(state, &actor, id, WriteMode::Partial, payload).await
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_allow(&actor, Resource::User, Action::Delete)?;

    if !state.store.delete_user(id).await? {
        return Err(user_not_found());
    }

    tracing::info!(user_id = %id, "Deleted user");

    Ok(StatusCode::NO_CONTENT)
}
