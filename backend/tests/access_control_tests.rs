//! Role capability and operator attribution tests
//!
//! Tests for who may do what:
//! - The role/capability matrix behind every protected route
//! - Operator resolution under each unknown-operator policy

use shared::{
    next_free_username, plan_operator_resolution, Capability, OperatorResolution, Role,
    UnknownOperatorPolicy,
};
use uuid::Uuid;

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;
    use Capability::*;

    const ALL: [Capability; 11] = [
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
    ];

    #[test]
    fn test_every_role_can_read_stock_and_statistics() {
        for role in [Role::Admin, Role::Warehouse, Role::Dispatcher] {
            assert!(role.can(ViewStock), "{} cannot view stock", role);
            assert!(role.can(ViewStatistics), "{} cannot view statistics", role);
            assert!(role.can(RequestOutbound), "{} cannot request outbound", role);
            assert!(role.can(UpdateTaskStatus), "{} cannot update task status", role);
        }
    }

    #[test]
    fn test_admin_only_capabilities() {
        for cap in [DecideOutbound, ManageUsers] {
            assert!(Role::Admin.can(cap));
            assert!(!Role::Warehouse.can(cap), "warehouse has {}", cap.as_str());
            assert!(!Role::Dispatcher.can(cap), "dispatcher has {}", cap.as_str());
        }
    }

    #[test]
    fn test_warehouse_matrix() {
        let granted: Vec<_> = ALL.iter().copied().filter(|c| Role::Warehouse.can(*c)).collect();
        assert_eq!(
            granted,
            vec![
                ViewStock,
                ManageCatalog,
                RecordInbound,
                RequestOutbound,
                CountInventory,
                UpdateTaskStatus,
                ViewStatistics,
                ExportRecords,
            ]
        );
    }

    #[test]
    fn test_dispatcher_matrix() {
        let granted: Vec<_> = ALL.iter().copied().filter(|c| Role::Dispatcher.can(*c)).collect();
        assert_eq!(
            granted,
            vec![ViewStock, RequestOutbound, ManageTasks, UpdateTaskStatus, ViewStatistics]
        );
    }

    #[test]
    fn test_known_operator_is_used_under_both_policies() {
        let id = Uuid::new_v4();
        for policy in [UnknownOperatorPolicy::Provision, UnknownOperatorPolicy::Reject] {
            assert_eq!(
                plan_operator_resolution("张三", Some(id), policy),
                OperatorResolution::Existing(id)
            );
        }
    }

    #[test]
    fn test_unknown_operator_policies() {
        match plan_operator_resolution("Zhang San", None, UnknownOperatorPolicy::Provision) {
            OperatorResolution::Provision(account) => {
                assert_eq!(account.real_name, "Zhang San");
                assert_eq!(account.role, Role::Warehouse);
                assert!(!account.username.is_empty());
            }
            other => panic!("expected provisioning, got {:?}", other),
        }

        assert_eq!(
            plan_operator_resolution("Zhang San", None, UnknownOperatorPolicy::Reject),
            OperatorResolution::Unknown("Zhang San".to_string())
        );
    }

    #[test]
    fn test_provisioned_username_avoids_existing_account() {
        let OperatorResolution::Provision(account) =
            plan_operator_resolution("Li Wei", None, UnknownOperatorPolicy::Provision)
        else {
            panic!("expected provisioning");
        };
        assert_eq!(account.username, "li_wei");

        // "li_wei" already belongs to a user whose real name is different
        let taken = vec!["li_wei".to_string()];
        assert_eq!(next_free_username(&account.username, &taken), "li_wei_2");
    }

    #[test]
    fn test_policy_config_names() {
        let policy: UnknownOperatorPolicy = serde_json::from_str("\"reject\"").unwrap();
        assert_eq!(policy, UnknownOperatorPolicy::Reject);
        assert_eq!(UnknownOperatorPolicy::default(), UnknownOperatorPolicy::Provision);
    }
}
