//! Operator directory: attributes inbound and outbound movements to a user

use shared::{
    next_free_username, plan_operator_resolution, LocalClock, OperatorResolution,
    UnknownOperatorPolicy, UserStatus,
};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::config::WarehouseConfig;
use crate::error::{AppError, AppResult};
use crate::services::auth::create_user;

/// A resolved operator
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Operator {
    pub id: Uuid,
    pub real_name: String,
}

/// Who the caller says performed a movement
#[derive(Debug, Clone, Default)]
pub struct OperatorRef {
    pub id: Option<Uuid>,
    pub name: Option<String>,
}

/// Resolves operator references against the users table.
///
/// Order: explicit id, then display name (real name or username), then the
/// authenticated caller. Unknown names follow the configured policy.
pub struct OperatorDirectory<'a> {
    policy: UnknownOperatorPolicy,
    provisioned_password: &'a str,
    clock: &'a LocalClock,
}

impl<'a> OperatorDirectory<'a> {
    pub fn new(config: &'a WarehouseConfig, clock: &'a LocalClock) -> Self {
        Self {
            policy: config.unknown_operator_policy,
            provisioned_password: &config.provisioned_password,
            clock,
        }
    }

    pub async fn resolve(
        &self,
        conn: &mut PgConnection,
        reference: &OperatorRef,
        caller_id: Uuid,
    ) -> AppResult<Operator> {
        if let Some(id) = reference.id {
            return find_by_id(conn, id)
                .await?
                .ok_or_else(|| AppError::NotFound("Operator".to_string()));
        }

        let name = reference
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());

        let Some(name) = name else {
            return find_by_id(conn, caller_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Operator".to_string()));
        };

        let found = sqlx::query_as::<_, Operator>(
            r#"
            SELECT id, real_name FROM users
            WHERE real_name = $1 OR username = $1
            ORDER BY (real_name = $1) DESC, created_at
            LIMIT 1
            "#,
        )
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

        match plan_operator_resolution(name, found.as_ref().map(|o| o.id), self.policy) {
            OperatorResolution::Existing(_) => {
                found.ok_or_else(|| AppError::NotFound("Operator".to_string()))
            }
            OperatorResolution::Provision(account) => {
                // The derived username may belong to someone with a different real name
                let taken = sqlx::query_scalar::<_, String>(
                    "SELECT username FROM users WHERE starts_with(username, $1)",
                )
                .bind(&account.username)
                .fetch_all(&mut *conn)
                .await?;
                let username = next_free_username(&account.username, &taken);

                let user = create_user(
                    &mut *conn,
                    &username,
                    self.provisioned_password,
                    &account.real_name,
                    account.role,
                    UserStatus::Active,
                    self.clock,
                )
                .await?;
                tracing::warn!(
                    user_id = %user.id,
                    username = %user.username,
                    "provisioned operator account for unknown name"
                );
                Ok(Operator {
                    id: user.id,
                    real_name: user.real_name,
                })
            }
            OperatorResolution::Unknown(name) => {
                Err(AppError::NotFound(format!("Operator '{}'", name)))
            }
        }
    }
}

async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<Operator>> {
    Ok(
        sqlx::query_as::<_, Operator>("SELECT id, real_name FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await?,
    )
}
