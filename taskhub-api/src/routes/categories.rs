/// Category endpoints (managers and admins)
///
/// # Endpoints
///
/// - `GET /v1/categories` - List categories ordered by name
/// - `POST /v1/categories` - Create a category
/// - `GET|PUT|PATCH|DELETE /v1/categories/:id`

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
use taskhub_shared::auth::authorization::{require_allow, Action, Actor, Resource};
use taskhub_shared::store::CategoryQuery;
use taskhub_shared::views::category::{CategoryPayload, CategoryView};
use taskhub_shared::views::WriteMode;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct CategoryListParams {
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn category_not_found() -> ApiError {
    ApiError::NotFound("Category not found".to_string())
}

pub async fn list_categories(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(params): Query<CategoryListParams>,
) -> ApiResult<Json<Vec<CategoryView>>> {
    require_allow(&actor, Resource::Category, Action::List)?;

    let query = CategoryQuery {
        search: params.search.filter(|s| !s.trim().is_empty()),
        page: page(params.limit, params.offset),
    };
    let categories = state.store.list_categories(&query).await?;

    Ok(Json(categories.iter().map(CategoryView::from).collect()))
}

/// Create a category
///
/// # Errors
///
/// - `403 Forbidden`: Caller is an employee
/// - `422 Unprocessable Entity`: Missing name or malformed color
pub async fn create_category(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiJson(payload): ApiJson<CategoryPayload>,
) -> ApiResult<(StatusCode, Json<CategoryView>)> {
    require_allow(&actor, Resource::Category, Action::Create)?;

    let category = state.store.create_category(payload.into_create()?).await?;

    tracing::info!(category_id = %category.id, name = %category.name, "Created category");

    Ok((StatusCode::CREATED, Json(CategoryView::from(&category))))
}

pub async fn get_category(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CategoryView>> {
    require_allow(&actor, Resource::Category, Action::Read)?;

    let category = state
        .store
        .get_category(id)
        .await?
        .ok_or_else(category_not_found)?;

    Ok(Json(CategoryView::from(&category)))
}

async fn update(
    state: AppState,
    actor: Actor,
    id: Uuid,
    mode: WriteMode,
    payload: CategoryPayload,
) -> ApiResult<Json<CategoryView>> {
    require_allow(&actor, Resource::Category, Action::Update)?;

    let category = state
        .store
        .update_category(id, payload.into_update(mode)?)
        .await?
        .ok_or_else(category_not_found)?;

    tracing::debug!(category_id = %id, "Updated category");

    Ok(Json(CategoryView::from(&category)))
}

pub async fn replace_category(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<CategoryPayload>,
) -> ApiResult<Json<CategoryView>> {
    update(state, actor, id, WriteMode::Replace, payload).await
}

pub async fn patch_category(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<CategoryPayload>,
) -> ApiResult<Json<CategoryView>> {
    update(state, actor, id, WriteMode::Partial, payload).await
}

pub async fn delete_category(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_allow(&actor, Resource::Category, Action::Delete)?;

    if !state.store.delete_category(id).await? {
        return Err(category_not_found());
    }

    tracing::info!(category_id = %id, "Deleted category");

    Ok(StatusCode::NO_CONTENT)
}
