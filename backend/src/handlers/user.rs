//! HTTP handlers for user administration

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{PaginatedResponse, Pagination, User};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::user::{
    CreateUserInput, PasswordReset, UpdateUserInput, UpdateUserStatusInput, UserFilter,
};
use crate::services::UserService;
use crate::AppState;

/// List accounts
pub async fn list_users(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    Query(filter): Query<UserFilter>,
) -> AppResult<Json<PaginatedResponse<User>>> {
    let service = UserService::new(state.db);
    let users = service.list(filter, pagination).await?;
    Ok(Json(users))
}

/// Create an account with any role
pub async fn create_user(
    State(state): State<AppState>,
    Json(input): Json<CreateUserInput>,
) -> AppResult<(StatusCode, Json<User>)> {
    let service = UserService::new(state.db);
    let user = service.create(input, &state.clock).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<User>> {
    let service = UserService::new(state.db);
    let user = service.get(user_id).await?;
    Ok(Json(user))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(input): Json<UpdateUserInput>,
) -> AppResult<Json<User>> {
    let service = UserService::new(state.db);
    let user = service.update(user_id, input).await?;
    Ok(Json(user))
}

/// Activate or deactivate an account
pub async fn update_user_status(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(input): Json<UpdateUserStatusInput>,
) -> AppResult<Json<User>> {
    let service = UserService::new(state.db);
    let user = service.update_status(user_id, input.status).await?;
    Ok(Json(user))
}

/// Generate a new password; it is only ever returned here
pub async fn reset_password(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<PasswordReset>> {
    let service = UserService::new(state.db);
    let reset = service.reset_password(user_id).await?;
    Ok(Json(reset))
}

pub async fn delete_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = UserService::new(state.db);
    service.delete(current_user.0.user_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
