//! HTTP handlers for user administration endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_admin, CurrentUser};
use crate::services::user::{
    CreateUserInput, ResetPasswordInput, UpdateUserInput, UserFilter, UserService,
};
use crate::AppState;
use shared::{PaginatedResponse, User};

/// Create a user account
pub async fn create_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateUserInput>,
) -> AppResult<(StatusCode, Json<User>)> {
    require_admin(&current_user.0)?;
    let service = UserService::new(state.db);
    let user = service.create_user(&input, current_user.0.role).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Get the caller's own account
pub async fn get_me(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<User>> {
    let service = UserService::new(state.db);
    let user = service.get_user(current_user.0.user_id).await?;
    Ok(Json(user))
}

/// Get a user by id
pub async fn get_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<User>> {
    require_admin(&current_user.0)?;
    let service = UserService::new(state.db);
    let user = service.get_user(user_id).await?;
    Ok(Json(user))
}

/// List user accounts
pub async fn list_users(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<UserFilter>,
) -> AppResult<Json<PaginatedResponse<User>>> {
    require_admin(&current_user.0)?;
    let service = UserService::new(state.db);
    let page = service.list_users(filter).await?;
    Ok(Json(page))
}

/// Update a user's name, role or active flag
pub async fn update_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(input): Json<UpdateUserInput>,
) -> AppResult<Json<User>> {
    require_admin(&current_user.0)?;
    let service = UserService::new(state.db);
    let user = service
        .update_user(user_id, input, current_user.0.user_id, current_user.0.role)
        .await?;
    Ok(Json(user))
}

/// Reset a user's password
pub async fn reset_password(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(input): Json<ResetPasswordInput>,
) -> AppResult<Json<()>> {
    require_admin(&current_user.0)?;
    let service = UserService::new(state.db);
    service.reset_password(user_id, &input).await?;
    Ok(Json(()))
}
