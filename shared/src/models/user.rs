//! User, role and capability models

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::username_from_display_name;

/// Reserved account that can never be deleted
pub const RESERVED_ADMIN_USERNAME: &str = "admin";

/// A staff account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub real_name: String,
    pub role: Role,
    pub status: UserStatus,
    pub created_at: NaiveDateTime,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    pub fn is_reserved_admin(&self) -> bool {
        self.username == RESERVED_ADMIN_USERNAME
    }
}

/// Staff role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(
    feature = "sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Warehouse,
    Dispatcher,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Warehouse => "warehouse",
            Role::Dispatcher => "dispatcher",
        }
    }

    /// Capabilities granted to this role
    pub fn capabilities(&self) -> &'static [Capability] {
        use Capability::*;
        match self {
            Role::Admin => &[
                ViewStock,
                ManageCatalog,
                RecordInbound,
                RequestOutbound,
                DecideOutbound,
                CountInventory,
                ManageTasks,
                UpdateTaskStatus,
                ManageUsers,
                ViewStatistics,
                ExportRecords,
            ],
            Role::Warehouse => &[
                ViewStock,
                ManageCatalog,
                RecordInbound,
                RequestOutbound,
                CountInventory,
                UpdateTaskStatus,
                ViewStatistics,
                ExportRecords,
            ],
            Role::Dispatcher => &[
                ViewStock,
                RequestOutbound,
                ManageTasks,
                UpdateTaskStatus,
                ViewStatistics,
            ],
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(
    feature = "sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "user_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
}

/// Operations an authenticated caller may be allowed to perform.
///
/// Every route declares exactly one capability; the authorization middleware
/// checks it against the caller's role before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ViewStock,
    ManageCatalog,
    RecordInbound,
    RequestOutbound,
    DecideOutbound,
    CountInventory,
    ManageTasks,
    UpdateTaskStatus,
    ManageUsers,
    ViewStatistics,
    ExportRecords,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ViewStock => "view_stock",
            Capability::ManageCatalog => "manage_catalog",
            Capability::RecordInbound => "record_inbound",
            Capability::RequestOutbound => "request_outbound",
            Capability::DecideOutbound => "decide_outbound",
            Capability::CountInventory => "count_inventory",
            Capability::ManageTasks => "manage_tasks",
            Capability::UpdateTaskStatus => "update_task_status",
            Capability::ManageUsers => "manage_users",
            Capability::ViewStatistics => "view_statistics",
            Capability::ExportRecords => "export_records",
        }
    }
}

// ============================================================================
// Operator resolution
// ============================================================================

/// What to do when an inbound/outbound caller names an operator that does not exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnknownOperatorPolicy {
    /// Create a warehouse account with the configured default password
    #[default]
    Provision,
    /// Refuse the operation with a not-found error
    Reject,
}

/// Account to create for an unknown operator name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedOperator {
    pub username: String,
    pub real_name: String,
    pub role: Role,
}

/// Outcome of resolving an operator by display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorResolution {
    Existing(Uuid),
    Provision(ProvisionedOperator),
    Unknown(String),
}

/// Decide how to attribute an action to `name` given the lookup result
pub fn plan_operator_resolution(
    name: &str,
    found: Option<Uuid>,
    policy: UnknownOperatorPolicy,
) -> OperatorResolution {
    if let Some(id) = found {
        return OperatorResolution::Existing(id);
    }
    match policy {
        UnknownOperatorPolicy::Provision => OperatorResolution::Provision(ProvisionedOperator {
            username: username_from_display_name(name),
            real_name: name.trim().to_string(),
            role: Role::Warehouse,
        }),
        UnknownOperatorPolicy::Reject => OperatorResolution::Unknown(name.trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_has_every_capability() {
        use Capability::*;
        for cap in [
            ViewStock,
            ManageCatalog,
            RecordInbound,
            RequestOutbound,
            DecideOutbound,
            CountInventory,
            ManageTasks,
            UpdateTaskStatus,
            ManageUsers,
            ViewStatistics,
            ExportRecords,
        ] {
            assert!(Role::Admin.can(cap), "admin lacks {}", cap.as_str());
        }
    }

    #[test]
    fn test_only_admin_decides_outbound() {
        assert!(Role::Admin.can(Capability::DecideOutbound));
        assert!(!Role::Warehouse.can(Capability::DecideOutbound));
        assert!(!Role::Dispatcher.can(Capability::DecideOutbound));
    }

    #[test]
    fn test_dispatcher_cannot_touch_catalog_or_inbound() {
        assert!(!Role::Dispatcher.can(Capability::ManageCatalog));
        assert!(!Role::Dispatcher.can(Capability::RecordInbound));
        assert!(Role::Dispatcher.can(Capability::ManageTasks));
    }

    #[test]
    fn test_role_serde_names() {
        assert_eq!(serde_json::to_string(&Role::Dispatcher).unwrap(), "\"dispatcher\"");
        let parsed: Role = serde_json::from_str("\"warehouse\"").unwrap();
        assert_eq!(parsed, Role::Warehouse);
        assert!(serde_json::from_str::<Role>("\"manager\"").is_err());
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            username: "warehouse".to_string(),
            password_hash: "$2b$12$secret".to_string(),
            real_name: "仓库管理员".to_string(),
            role: Role::Warehouse,
            status: UserStatus::Active,
            created_at: chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("password_hash"));
    }

    #[test]
    fn test_existing_operator_wins_over_policy() {
        let id = Uuid::new_v4();
        assert_eq!(
            plan_operator_resolution("Li Wei", Some(id), UnknownOperatorPolicy::Reject),
            OperatorResolution::Existing(id)
        );
    }

    #[test]
    fn test_unknown_operator_provisioned_as_warehouse() {
        let plan = plan_operator_resolution(" Li Wei ", None, UnknownOperatorPolicy::Provision);
        assert_eq!(
            plan,
            OperatorResolution::Provision(ProvisionedOperator {
                username: "li_wei".to_string(),
                real_name: "Li Wei".to_string(),
                role: Role::Warehouse,
            })
        );
    }

    #[test]
    fn test_unknown_operator_rejected_under_strict_policy() {
        let plan = plan_operator_resolution("ghost", None, UnknownOperatorPolicy::Reject);
        assert_eq!(plan, OperatorResolution::Unknown("ghost".to_string()));
    }
}
