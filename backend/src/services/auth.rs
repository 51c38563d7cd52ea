//! Authentication service for login, self-registration and token management

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::{
    validate_password, validate_username, LocalClock, Role, User, UserStatus,
    RESERVED_ADMIN_USERNAME,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{is_unique_violation, AppError, AppResult};

/// Columns selected whenever a full `User` row is loaded
pub const USER_COLUMNS: &str = "id, username, password_hash, real_name, role, status, created_at";

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

/// Successful login
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: User,
}

/// Input for self-registration
#[derive(Debug, Deserialize)]
pub struct RegisterInput {
    pub username: String,
    pub password: String,
    pub real_name: String,
}

/// Hash a password with bcrypt
pub fn hash_password(password: &str) -> AppResult<String> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Sign an access token for `user_id`
pub fn issue_token(user_id: Uuid, role: Role, secret: &str, expiry_seconds: i64) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        role,
        exp: (now + Duration::seconds(expiry_seconds)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Validate an access token and return its claims
pub fn decode_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!("token rejected: {}", e);
        AppError::InvalidToken
    })
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
        }
    }

    /// Authenticate with username and password
    pub async fn login(&self, username: &str, password: &str) -> AppResult<LoginResponse> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username.trim())
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        let valid = verify(password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        if !user.is_active() {
            return Err(AppError::AccountDisabled);
        }

        let access_token = issue_token(user.id, user.role, &self.jwt_secret, self.access_token_expiry)?;

        tracing::info!(user_id = %user.id, username = %user.username, "user logged in");

        Ok(LoginResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
            user,
        })
    }

    /// Self-registration always creates an active warehouse account
    pub async fn register(&self, input: RegisterInput, clock: &LocalClock) -> AppResult<User> {
        validate_username(input.username.trim())?;
        validate_password(&input.password)?;
        shared::ensure_not_blank("real_name", &input.real_name)?;

        create_user(
            &self.db,
            input.username.trim(),
            &input.password,
            input.real_name.trim(),
            Role::Warehouse,
            UserStatus::Active,
            clock,
        )
        .await
    }

    /// Current user profile
    pub async fn me(&self, user_id: Uuid) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    /// Create the reserved admin account when no user exists yet
    pub async fn ensure_bootstrap_admin(&self, password: &str, clock: &LocalClock) -> AppResult<()> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;

        if count > 0 {
            return Ok(());
        }

        let admin = create_user(
            &self.db,
            RESERVED_ADMIN_USERNAME,
            password,
            "系统管理员",
            Role::Admin,
            UserStatus::Active,
            clock,
        )
        .await?;

        tracing::warn!(
            user_id = %admin.id,
            "created bootstrap admin account; change its password"
        );
        Ok(())
    }
}

/// Insert a user row; a taken username is a conflict
pub async fn create_user<'e, E>(
    executor: E,
    username: &str,
    password: &str,
    real_name: &str,
    role: Role,
    status: UserStatus,
    clock: &LocalClock,
) -> AppResult<User>
where
    E: sqlx::PgExecutor<'e>,
{
    let password_hash = hash_password(password)?;

    sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (id, username, password_hash, real_name, role, status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {}
        "#,
        USER_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(&password_hash)
    .bind(real_name)
    .bind(role)
    .bind(status)
    .bind(clock.now())
    .fetch_one(executor)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::conflict("username", "Username already exists", "用户名已存在")
        } else {
            AppError::from(e)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip_carries_identity() {
        let id = Uuid::new_v4();
        let token = issue_token(id, Role::Dispatcher, "test-secret", 3600).unwrap();
        let claims = decode_token(&token, "test-secret").unwrap();
        assert_eq!(claims.sub, id.to_string());
        assert_eq!(claims.role, Role::Dispatcher);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_with_wrong_secret_rejected() {
        let token = issue_token(Uuid::new_v4(), Role::Admin, "one", 3600).unwrap();
        assert!(matches!(decode_token(&token, "two"), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = issue_token(Uuid::new_v4(), Role::Admin, "secret", -3600).unwrap();
        assert!(matches!(decode_token(&token, "secret"), Err(AppError::InvalidToken)));
    }
}
