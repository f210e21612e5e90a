/// Task endpoints
///
/// Collection reads are always scoped by the actor's visibility: managers and
/// admins see every task, employees only tasks they created or are assigned
/// to. Filters, search and ordering combine with that scope before
/// pagination.
///
/// # Endpoints
///
/// - `GET /v1/tasks` - Visible tasks (summary)
/// - `POST /v1/tasks` - Create a task owned by the caller
/// - `GET /v1/tasks/my_tasks` - Visible tasks assigned to the caller
/// - `GET /v1/tasks/created_tasks` - Visible tasks created by the caller
/// - `GET /v1/tasks/:id` - One task with its comments (detail)
/// - `PUT|PATCH|DELETE /v1/tasks/:id` - Creator, assignee, manager or admin

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
    authorize_task_change, require_allow, require_principal, task_visibility, Action, Actor,
    Resource, TaskVisibility,
};
use taskhub_shared::models::task::{Priority, TaskRecord, TaskStatus};
use taskhub_shared::store::{CommentQuery, TaskOrdering, TaskQuery};
use taskhub_shared::views::task::{reference_errors, TaskDetail, TaskPayload, TaskSummary};
use taskhub_shared::views::{FieldErrors, WriteMode};
use uuid::Uuid;

/// Query parameters for task collections
#[derive(Debug, Default, Deserialize)]
pub struct TaskListParams {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub search: Option<String>,

    /// `created_at`, `due_date`, `priority` or `status`; `-` prefix for descending
    pub ordering: Option<String>,

    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl TaskListParams {
    fn into_query(self, visibility: TaskVisibility) -> Result<TaskQuery, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut query = TaskQuery::new(visibility);

        if let Some(value) = self.status.as_deref().filter(|v| !v.is_empty()) {
            query.status = TaskStatus::parse(value);
            if query.status.is_none() {
                errors.push("status", format!("\"{value}\" is not a valid choice."));
            }
        }
        if let Some(value) = self.priority.as_deref().filter(|v| !v.is_empty()) {
            query.priority = Priority::parse(value);
            if query.priority.is_none() {
                errors.push("priority", format!("\"{value}\" is not a valid choice."));
            }
        }
        if let Some(value) = self.ordering.as_deref().filter(|v| !v.is_empty()) {
            match TaskOrdering::parse(value) {
                Some(ordering) => query.ordering = ordering,
                None => errors.push("ordering", format!("Cannot order by \"{value}\".")),
            }
        }

        errors.into_result()?;

        query.category = self.category;
        query.assigned_to = self.assigned_to;
        query.search = self.search.filter(|s| !s.trim().is_empty());
        query.page = page(self.limit, self.offset);

        Ok(query)
    }
}

fn task_not_found() -> ApiError {
    ApiError::NotFound("Task not found".to_string())
}

/// Loads a task the actor may read
///
/// A task outside the actor's visibility is reported exactly like a missing
/// one.
pub(crate) async fn load_visible_task(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
) -> ApiResult<TaskRecord> {
    let visibility = task_visibility(actor)?;

    let record = state
        .store
        .get_task(id)
        .await?
        .filter(|record| visibility.admits(record))
        .ok_or_else(task_not_found)?;

    Ok(record)
}

/// Per-field errors for assignee and category ids that don't exist
async fn check_references(state: &AppState, payload: &TaskPayload) -> ApiResult<FieldErrors> {
    let (users, categories) = payload.referenced_ids();

    let missing_users = if users.is_empty() {
        Vec::new()
    } else {
        state.store.missing_user_ids(&users).await?
    };
    let missing_categories = if categories.is_empty() {
        Vec::new()
    } else {
        state.store.missing_category_ids(&categories).await?
    };

    Ok(reference_errors(&missing_users, &missing_categories))
}

/// Merges reference errors with the payload's own validation result
fn merge<T>(mut errors: FieldErrors, parsed: Result<T, FieldErrors>) -> ApiResult<T> {
    match parsed {
        Ok(value) if errors.is_empty() => Ok(value),
        Ok(_) => Err(errors.into()),
        Err(invalid) => {
            errors.0.extend(invalid.0);
            Err(errors.into())
        }
    }
}

async fn list(state: AppState, query: TaskQuery) -> ApiResult<Json<Vec<TaskSummary>>> {
    let tasks = state.store.list_tasks(&query).await?;

    tracing::debug!(count = tasks.len(), "Listed tasks");

    Ok(Json(tasks.iter().map(TaskSummary::from).collect()))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(params): Query<TaskListParams>,
) -> ApiResult<Json<Vec<TaskSummary>>> {
    let query = params.into_query(task_visibility(&actor)?)?;
    list(state, query).await
}

pub async fn my_tasks(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(params): Query<TaskListParams>,
) -> ApiResult<Json<Vec<TaskSummary>>> {
    let principal = require_principal(&actor)?;

    let mut query = params.into_query(task_visibility(&actor)?)?;
    query.assigned_to = Some(principal.id);

    list(state, query).await
}

pub async fn created_tasks(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(params): Query<TaskListParams>,
) -> ApiResult<Json<Vec<TaskSummary>>> {
    let principal = require_principal(&actor)?;

    let mut query = params.into_query(task_visibility(&actor)?)?;
    query.created_by = Some(principal.id);

    list(state, query).await
}

/// Create a task
///
/// # Endpoint
///
/// ```text
/// POST /v1/tasks
/// Content-Type: application/json
///
/// {
///   "title": "Fix bug",
///   "due_date": "2030-01-01T12:00:00Z",
///   "priority": "high",
///   "assigned_to": ["uuid"],
///   "categories": ["uuid"]
/// }
/// ```
///
/// The creator is always the caller. Assignees and categories are set in the
/// same transaction as the task itself.
///
/// # Errors
///
/// - `401 Unauthorized`: Anonymous caller
/// - `422 Unprocessable Entity`: Invalid fields or unknown referenced ids
pub async fn create_task(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiJson(payload): ApiJson<TaskPayload>,
) -> ApiResult<(StatusCode, Json<TaskSummary>)> {
    require_allow(&actor, Resource::Task, Action::Create)?;
    let principal = require_principal(&actor)?;

    let reference_errors = check_references(&state, &payload).await?;
    let data = merge(reference_errors, payload.into_create(principal.id))?;

    let record = state.store.create_task(data).await?;

    tracing::info!(
        task_id = %record.task.id,
        created_by = %principal.id,
        assignees = record.assignees.len(),
        "Created task"
    );

    Ok((StatusCode::CREATED, Json(TaskSummary::from(&record))))
}

/// Fetch one task with its comments
///
/// # Errors
///
/// - `404 Not Found`: Missing, or outside the caller's visibility
pub async fn get_task(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskDetail>> {
    let record = load_visible_task(&state, &actor, id).await?;

    let comments = state
        .store
        .list_comments(&CommentQuery {
            task: Some(id),
            ..Default::default()
        })
        .await?;

    Ok(Json(TaskDetail::new(&record, &comments)))
}

/// Loads a task for modification
///
/// Existence is checked first, then the change rule; an unrelated employee
/// gets 403 here rather than the 404 a read would give.
async fn load_for_change(state: &AppState, actor: &Actor, id: Uuid) -> ApiResult<TaskRecord> {
    require_principal(actor)?;

    let record = state.store.get_task(id).await?.ok_or_else(task_not_found)?;
    authorize_task_change(actor, &record)?;

    Ok(record)
}

async fn update(
    state: AppState,
    actor: Actor,
    id: Uuid,
    mode: WriteMode,
    payload: TaskPayload,
) -> ApiResult<Json<TaskSummary>> {
    load_for_change(&state, &actor, id).await?;

    let reference_errors = check_references(&state, &payload).await?;
    let data = merge(reference_errors, payload.into_update(mode))?;

    let record = state
        .store
        .update_task(id, data)
        .await?
        .ok_or_else(task_not_found)?;

    tracing::debug!(task_id = %id, status = record.task.status.as_str(), "Updated task");

    Ok(Json(TaskSummary::from(&record)))
}

pub async fn replace_task(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<TaskPayload>,
) -> ApiResult<Json<TaskSummary>> {
    update(state, actor, id, WriteMode::Replace, payload).await
}

pub async fn patch_task(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<TaskPayload>,
) -> ApiResult<Json<TaskSummary>> {
    update(state, actor, id, WriteMode::Partial, payload).await
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    load_for_change(&state, &actor, id).await?;

    if !state.store.delete_task(id).await? {
        return Err(task_not_found());
    }

    tracing::info!(task_id = %id, "Deleted task");

    Ok(StatusCode::NO_CONTENT)
}
