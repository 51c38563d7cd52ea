//! User administration service

use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use shared::{
    ensure_not_blank, validate_password, validate_username, LocalClock, PaginatedResponse,
    Pagination, Role, User, UserStatus,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{is_foreign_key_violation, AppError, AppResult};
use crate::services::auth::{create_user, hash_password, USER_COLUMNS};

/// User administration service
#[derive(Clone)]
pub struct UserService {
    db: PgPool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(length(min = 3, max = 80))]
    pub username: String,
    #[validate(length(min = 6))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub real_name: String,
    pub role: Role,
    pub status: Option<UserStatus>,
}

/// Partial update; absent fields are left untouched
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserInput {
    #[validate(length(min = 1, max = 100))]
    pub real_name: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
    #[validate(length(min = 6))]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserStatusInput {
    pub status: UserStatus,
}

#[derive(Debug, Deserialize)]
pub struct UserFilter {
    /// Substring over username
    pub username: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
}

/// A freshly generated password, shown once
#[derive(Debug, Serialize)]
pub struct PasswordReset {
    pub user_id: Uuid,
    pub new_password: String,
}

const RESET_PASSWORD_LEN: usize = 8;

impl UserService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Accounts, newest first
    pub async fn list(
        &self,
        filter: UserFilter,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<User>> {
        let pagination = pagination.normalized();
        let username = filter
            .username
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM users
            WHERE ($1::text IS NULL OR username ILIKE $1)
              AND ($2::user_role IS NULL OR role = $2)
              AND ($3::user_status IS NULL OR status = $3)
            "#,
        )
        .bind(&username)
        .bind(filter.role)
        .bind(filter.status)
        .fetch_one(&self.db)
        .await?;

        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {} FROM users
            WHERE ($1::text IS NULL OR username ILIKE $1)
              AND ($2::user_role IS NULL OR role = $2)
              AND ($3::user_status IS NULL OR status = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
            USER_COLUMNS
        ))
        .bind(&username)
        .bind(filter.role)
        .bind(filter.status)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(users, pagination, total))
    }

    pub async fn get(&self, user_id: Uuid) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    /// Create an account with any role
    pub async fn create(&self, input: CreateUserInput, clock: &LocalClock) -> AppResult<User> {
        input.validate()?;
        validate_username(input.username.trim())?;
        validate_password(&input.password)?;
        ensure_not_blank("real_name", &input.real_name)?;

        let user = create_user(
            &self.db,
            input.username.trim(),
            &input.password,
            input.real_name.trim(),
            input.role,
            input.status.unwrap_or_default(),
            clock,
        )
        .await?;

        tracing::info!(user_id = %user.id, username = %user.username, role = %user.role, "user created");
        Ok(user)
    }

    pub async fn update(&self, user_id: Uuid, input: UpdateUserInput) -> AppResult<User> {
        input.validate()?;
        let current = self.get(user_id).await?;

        let real_name = match input.real_name {
            Some(name) => {
                ensure_not_blank("real_name", &name)?;
                name.trim().to_string()
            }
            None => current.real_name,
        };
        let password_hash = match input.password.as_deref() {
            Some(password) => {
                validate_password(password)?;
                hash_password(password)?
            }
            None => current.password_hash,
        };

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET real_name = $2, role = $3, status = $4, password_hash = $5
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(&real_name)
        .bind(input.role.unwrap_or(current.role))
        .bind(input.status.unwrap_or(current.status))
        .bind(&password_hash)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(user_id = %user.id, role = %user.role, status = ?user.status, "user updated");
        Ok(user)
    }

    pub async fn update_status(&self, user_id: Uuid, status: UserStatus) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET status = $2 WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(status)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        tracing::info!(user_id = %user.id, status = ?status, "user status changed");
        Ok(user)
    }

    /// Replace the password with a random one and return it
    pub async fn reset_password(&self, user_id: Uuid) -> AppResult<PasswordReset> {
        self.get(user_id).await?;

        let new_password = generate_password();
        let password_hash = hash_password(&new_password)?;

        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(user_id)
            .bind(&password_hash)
            .execute(&self.db)
            .await?;

        tracing::info!(user_id = %user_id, "password reset");
        Ok(PasswordReset {
            user_id,
            new_password,
        })
    }

    /// Delete an account with no movement or task history.
    ///
    /// The reserved admin account and the caller's own account are refused.
    pub async fn delete(&self, caller_id: Uuid, user_id: Uuid) -> AppResult<()> {
        let user = self.get(user_id).await?;

        if user.id == caller_id {
            return Err(AppError::conflict(
                "user",
                "You cannot delete your own account",
                "不能删除自己的账号",
            ));
        }
        if user.is_reserved_admin() {
            return Err(AppError::conflict(
                "user",
                "The reserved admin account cannot be deleted",
                "不能删除系统管理员账号",
            ));
        }

        let references = sqlx::query_as::<_, UserReferences>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM inbound_records WHERE operator_id = $1) AS inbound,
                (SELECT COUNT(*) FROM outbound_records WHERE applicant_id = $1) AS outbound,
                (SELECT COUNT(*) FROM outbound_records WHERE approver_id = $1) AS approvals,
                (SELECT COUNT(*) FROM dispatch_tasks
                    WHERE assignee_id = $1 OR creator_id = $1) AS tasks,
                (SELECT COUNT(*) FROM inventory_checks WHERE checker_id = $1) AS checks
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        if let Some((en, zh)) = references.blockers() {
            return Err(AppError::conflict("user", en, zh));
        }

        // A reference created after the count still surfaces as a conflict
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    AppError::conflict(
                        "user",
                        "User is still referenced by other records",
                        "无法删除该用户，存在关联数据",
                    )
                } else {
                    AppError::from(e)
                }
            })?;

        tracing::info!(user_id = %user_id, username = %user.username, "user deleted");
        Ok(())
    }
}

/// Random password over ASCII letters and digits
fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RESET_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

/// Rows in other tables that point at a user
#[derive(Debug, Default, Clone, Copy, FromRow)]
struct UserReferences {
    inbound: i64,
    outbound: i64,
    approvals: i64,
    tasks: i64,
    checks: i64,
}

impl UserReferences {
    /// English and Chinese messages listing what still references the user
    fn blockers(&self) -> Option<(String, String)> {
        let counts = [
            (self.inbound, "inbound records", "入库记录"),
            (self.outbound, "outbound requests", "出库申请"),
            (self.approvals, "outbound approvals", "出库审批"),
            (self.tasks, "tasks", "任务"),
            (self.checks, "inventory checks", "盘点记录"),
        ];

        let (en, zh): (Vec<_>, Vec<_>) = counts
            .into_iter()
            .filter(|(count, _, _)| *count > 0)
            .map(|(count, en, zh)| (format!("{} {}", count, en), format!("{} {} 条", zh, count)))
            .unzip();

        if en.is_empty() {
            return None;
        }
        Some((
            format!("User is still referenced: {}", en.join(", ")),
            format!("无法删除该用户，存在关联数据：{}", zh.join("、")),
        ))
    }
}
