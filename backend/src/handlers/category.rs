//! HTTP handlers for category endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_admin, CurrentUser};
use crate::services::category::{Category, CategoryInput, CategoryService};
use crate::AppState;

/// Create a category
pub async fn create_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CategoryInput>,
) -> AppResult<(StatusCode, Json<Category>)> {
    require_admin(&current_user.0)?;
    let service = CategoryService::new(state.db);
    let category = service.create_category(&input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// Get a category by id
pub async fn get_category(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(category_id): Path<Uuid>,
) -> AppResult<Json<Category>> {
    let service = CategoryService::new(state.db);
    let category = service.get_category(category_id).await?;
    Ok(Json(category))
}

/// List all categories
pub async fn list_categories(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<Category>>> {
    let service = CategoryService::new(state.db);
    let categories = service.list_categories().await?;
    Ok(Json(categories))
}

/// Update a category
pub async fn update_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(category_id): Path<Uuid>,
    Json(input): Json<CategoryInput>,
) -> AppResult<Json<Category>> {
    require_admin(&current_user.0)?;
    let service = CategoryService::new(state.db);
    let category = service.update_category(category_id, &input).await?;
    Ok(Json(category))
}

/// Delete a category
pub async fn delete_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(category_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    require_admin(&current_user.0)?;
    let service = CategoryService::new(state.db);
    service.delete_category(category_id).await?;
    Ok(Json(()))
}
