//! Error handling for the plate warehouse server
//!
//! Provides consistent error responses in English and Chinese

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::DomainError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account disabled")]
    AccountDisabled,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Insufficient permissions: {0}")]
    InsufficientPermissions(String),

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String, message_zh: String },

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_zh: String,
    },

    #[error("Conflict: {message}")]
    Conflict {
        resource: String,
        message: String,
        message_zh: String,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Workflow errors
    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i32, available: i32 },

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(field: &str, message: impl Into<String>, message_zh: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
            message_zh: message_zh.into(),
        }
    }

    pub fn conflict(resource: &str, message: impl Into<String>, message_zh: impl Into<String>) -> Self {
        AppError::Conflict {
            resource: resource.to_string(),
            message: message.into(),
            message_zh: message_zh.into(),
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation { field, message } => AppError::Validation {
                message_zh: format!("参数错误: {}", message),
                field,
                message,
            },
            DomainError::InsufficientStock {
                requested,
                available,
            } => AppError::InsufficientStock {
                requested,
                available,
            },
            DomainError::AlreadyDecided { status } => AppError::InvalidStateTransition(status),
            DomainError::QuantityOverflow { field } => AppError::Validation {
                message: "quantity exceeds the storable maximum".to_string(),
                message_zh: "数量超出上限".to_string(),
                field,
            },
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field_errors = errors.field_errors();
        let mut fields: Vec<_> = field_errors.keys().copied().collect();
        fields.sort_unstable();
        let field = fields.first().copied().unwrap_or("body");
        let message = field_errors
            .get(field)
            .and_then(|errs| errs.first())
            .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| format!("{} is invalid", field));

        AppError::Validation {
            field: field.to_string(),
            message_zh: format!("参数错误: {}", field),
            message,
        }
    }
}

/// True when `err` is a PostgreSQL unique-constraint violation
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// True when `err` is a PostgreSQL foreign-key violation
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_zh: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    pub fn new(code: &str, message_en: impl Into<String>, message_zh: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message_en: message_en.into(),
            message_zh: message_zh.into(),
            field: None,
        }
    }

    fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }
}

impl AppError {
    fn status_and_detail(&self) -> (StatusCode, ErrorDetail) {
        match self {
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("INVALID_CREDENTIALS", "Invalid username or password", "用户名或密码错误"),
            ),
            AppError::AccountDisabled => (
                StatusCode::FORBIDDEN,
                ErrorDetail::new("ACCOUNT_DISABLED", "Account is disabled", "账户已被禁用"),
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("INVALID_TOKEN", "Invalid or expired token", "令牌无效或已过期"),
            ),
            AppError::InsufficientPermissions(capability) => (
                StatusCode::FORBIDDEN,
                ErrorDetail::new(
                    "INSUFFICIENT_PERMISSIONS",
                    format!("You do not have permission to perform this action ({})", capability),
                    "权限不足",
                ),
            ),
            AppError::Unauthorized { message, message_zh } => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("UNAUTHORIZED", message.clone(), message_zh.clone()),
            ),
            AppError::Validation {
                field,
                message,
                message_zh,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", message.clone(), message_zh.clone()).with_field(field),
            ),
            AppError::Conflict {
                resource,
                message,
                message_zh,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("CONFLICT", message.clone(), message_zh.clone()).with_field(resource),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("NOT_FOUND", format!("{} not found", resource), format!("{}不存在", resource)),
            ),
            AppError::InsufficientStock {
                requested,
                available,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new(
                    "INSUFFICIENT_STOCK",
                    format!("Insufficient stock: requested {}, current quantity {}", requested, available),
                    format!("库存不足，当前库存: {}", available),
                )
                .with_field("quantity"),
            ),
            AppError::InvalidStateTransition(status) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new(
                    "INVALID_STATE_TRANSITION",
                    format!("Request already processed, current status: {}", status),
                    format!("该申请已处理，当前状态: {}", status),
                ),
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("DATABASE_ERROR", "A database error occurred", "数据库错误"),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", msg.clone(), "服务器内部错误"),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.status_and_detail();

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_conflicts_are_bad_request() {
        let (status, detail) = AppError::from(DomainError::AlreadyDecided {
            status: "approved".to_string(),
        })
        .status_and_detail();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(detail.code, "INVALID_STATE_TRANSITION");
        assert!(detail.message_en.contains("approved"));
    }

    #[test]
    fn test_insufficient_stock_reports_current_quantity() {
        let (status, detail) = AppError::from(DomainError::InsufficientStock {
            requested: 200,
            available: 70,
        })
        .status_and_detail();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(detail.code, "INSUFFICIENT_STOCK");
        assert!(detail.message_en.contains("70"));
    }

    #[test]
    fn test_domain_validation_keeps_field() {
        let (status, detail) =
            AppError::from(DomainError::validation("quantity", "quantity must be greater than 0"))
                .status_and_detail();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(detail.field.as_deref(), Some("quantity"));
    }

    #[test]
    fn test_auth_statuses() {
        assert_eq!(AppError::InvalidToken.status_and_detail().0, StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::AccountDisabled.status_and_detail().0, StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::InsufficientPermissions("decide_outbound".into()).status_and_detail().0,
            StatusCode::FORBIDDEN
        );
        assert_eq!(AppError::NotFound("Plate".into()).status_and_detail().0, StatusCode::NOT_FOUND);
    }
}
