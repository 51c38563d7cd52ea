//! Authentication handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use shared::User;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::auth::{LoginResponse, RegisterInput};
use crate::services::AuthService;
use crate::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login endpoint handler
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let response = auth_service.login(&body.username, &body.password).await?;
    Ok(Json(response))
}

/// Self-registration; the new account always gets the warehouse role
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterInput>,
) -> AppResult<(StatusCode, Json<User>)> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let user = auth_service.register(body, &state.clock).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Profile of the authenticated caller
pub async fn me(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<User>> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let user = auth_service.me(current_user.0.user_id).await?;
    Ok(Json(user))
}
