/// Comment endpoints
///
/// # Endpoints
///
/// - `GET /v1/comments?task=<id>` - Comments in creation order
/// - `POST /v1/comments` - Comment on a task the caller can read
/// - `GET /v1/comments/:id`
/// - `PUT|PATCH|DELETE /v1/comments/:id` - Author, manager or admin

use super::{page, tasks::load_visible_task};
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
    authorize_comment_change, require_allow, require_principal, Action, Actor, Resource,
};
use taskhub_shared::models::comment::CommentRecord;
use taskhub_shared::store::CommentQuery;
use taskhub_shared::views::comment::{CommentPayload, CommentView};
use taskhub_shared::views::WriteMode;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct CommentListParams {
    /// Only comments on this task
    pub task: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn comment_not_found() -> ApiError {
    ApiError::NotFound("Comment not found".to_string())
}

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(params): Query<CommentListParams>,
) -> ApiResult<Json<Vec<CommentView>>> {
    require_allow(&actor, Resource::Comment, Action::List)?;

    let query = CommentQuery {
        task: params.task,
        page: page(params.limit, params.offset),
    };
    let comments = state.store.list_comments(&query).await?;

    Ok(Json(comments.iter().map(CommentView::from).collect()))
}

/// Comment on a task
///
/// # Endpoint
///
/// ```text
/// POST /v1/comments
/// Content-Type: application/json
///
/// { "task": "uuid", "content": "On it" }
/// ```
///
/// # Errors
///
/// - `404 Not Found`: The task is missing or not visible to the caller
/// - `422 Unprocessable Entity`: Missing or malformed task, or missing content
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiJson(payload): ApiJson<CommentPayload>,
) -> ApiResult<(StatusCode, Json<CommentView>)> {
    require_allow(&actor, Resource::Comment, Action::Create)?;
    let principal = require_principal(&actor)?;

    let task_id = payload.task_id()?;
    load_visible_task(&state, &actor, task_id).await?;

    let record = state
        .store
        .create_comment(payload.into_create(principal.id)?)
        .await?;

    tracing::info!(
        comment_id = %record.comment.id,
        task_id = %task_id,
        user_id = %principal.id,
        "Created comment"
    );

    Ok((StatusCode::CREATED, Json(CommentView::from(&record))))
}

pub async fn get_comment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CommentView>> {
    require_allow(&actor, Resource::Comment, Action::Read)?;

    let record = state
        .store
        .get_comment(id)
        .await?
        .ok_or_else(comment_not_found)?;

    Ok(Json(CommentView::from(&record)))
}

async fn load_for_change(state: &AppState, actor: &Actor, id: Uuid) -> ApiResult<CommentRecord> {
    require_principal(actor)?;

    let record = state
        .store
        .get_comment(id)
        .await?
        .ok_or_else(comment_not_found)?;
    authorize_comment_change(actor, &record)?;

    Ok(record)
}

async fn update(
    state: AppState,
    actor: Actor,
    id: Uuid,
    mode: WriteMode,
    payload: CommentPayload,
) -> ApiResult<Json<CommentView>> {
    let current = load_for_change(&state, &actor, id).await?;

    let Some(content) = payload.into_update(mode)? else {
        return Ok(Json(CommentView::from(&current)));
    };

    let record = state
        .store
        .update_comment(id, content)
        .await?
        .ok_or_else(comment_not_found)?;

    tracing::debug!(comment_id = %id, "Updated comment");

    Ok(Json(CommentView::from(&record)))
}

pub async fn replace_comment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<CommentPayload>,
) -> ApiResult<Json<CommentView>> {
    update(state, actor, id, WriteMode::Replace, payload).await
}

pub async fn patch_comment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<CommentPayload>,
) -> ApiResult<Json<CommentView>> {
    update(state, actor, id, WriteMode::Partial, payload).await
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    load_for_change(&state, &actor, id).await?;

    if !state.store.delete_comment(id).await? {
        return Err(comment_not_found());
    }

    tracing::info!(comment_id = %id, "Deleted comment");

    Ok(StatusCode::NO_CONTENT)
}
