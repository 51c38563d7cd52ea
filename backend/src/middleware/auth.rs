//! Authentication middleware
//!
//! JWT authentication and capability-based access control middleware

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::{Capability, Role, UserStatus};
use uuid::Uuid;

use crate::error::AppError;
use crate::services::auth::decode_token;
use crate::AppState;

/// Authenticated caller, resolved from the bearer token and the users table
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn can(&self, capability: Capability) -> bool {
        self.role.can(capability)
    }
}

/// Authentication middleware that validates JWT tokens.
///
/// The token only identifies the caller; role and status are read from the
/// database on every request so that deactivation takes effect immediately.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(&request) {
        Some(token) => token,
        None => {
            return AppError::Unauthorized {
                message: "Missing or invalid Authorization header".to_string(),
                message_zh: "缺少认证信息".to_string(),
            }
            .into_response()
        }
    };

    let claims = match decode_token(token, &state.config.jwt.secret) {
        Ok(claims) => claims,
        Err(err) => return err.into_response(),
    };

    let user_id = match Uuid::parse_str(&claims.sub) {
        Ok(id) => id,
        Err(_) => return AppError::InvalidToken.into_response(),
    };

    let row = sqlx::query_as::<_, (Role, UserStatus)>("SELECT role, status FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&state.db)
        .await;

    let role = match row {
        Ok(Some((role, UserStatus::Active))) => role,
        Ok(Some((_, UserStatus::Inactive))) => return AppError::AccountDisabled.into_response(),
        Ok(None) => return AppError::InvalidToken.into_response(),
        Err(err) => return AppError::from(err).into_response(),
    };

    request.extensions_mut().insert(AuthUser { user_id, role });

    next.run(request).await
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Per-route capability check.
///
/// Mount with `middleware::from_fn_with_state(Capability::X, authorize)`
/// inside a router already guarded by [`auth_middleware`].
pub async fn authorize(
    State(capability): State<Capability>,
    request: Request,
    next: Next,
) -> Response {
    let Some(user) = request.extensions().get::<AuthUser>() else {
        return AppError::Unauthorized {
            message: "Authentication required".to_string(),
            message_zh: "请先登录".to_string(),
        }
        .into_response();
    };

    if !user.can(capability) {
        tracing::debug!(
            user_id = %user.user_id,
            role = %user.role,
            capability = capability.as_str(),
            "capability check failed"
        );
        return AppError::InsufficientPermissions(capability.as_str().to_string()).into_response();
    }

    next.run(request).await
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized {
                message: "Authentication required".to_string(),
                message_zh: "请先登录".to_string(),
            })
    }
}
