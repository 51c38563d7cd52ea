//! Inventory ledger and outbound workflow tests
//!
//! Tests for stock movement rules including:
//! - Inbound receipts add to the (plate, batch) line
//! - Outbound approval decrements exactly once
//! - Rejection never touches the ledger
//! - Physical counts overwrite the line and record the difference

use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use shared::{
    DomainError, InboundRecord, InventoryCheck, InventoryLine, OutboundRecord, OutboundStatus,
    Plate, TaskPriority, TaskStatus,
};
use uuid::Uuid;

fn at(hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn plate_6061() -> Plate {
    Plate {
        id: Uuid::new_v4(),
        model: "6061".to_string(),
        specification: "10mm".to_string(),
        unit: "张".to_string(),
        supplier: Some("Southwest Aluminum".to_string()),
        note: None,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Receive 100, request 30, approve, then a second approval fails
    #[test]
    fn test_request_approve_then_double_approve() {
        let plate = plate_6061();
        let warehouse = Uuid::new_v4();
        let admin = Uuid::new_v4();

        let receipt =
            InboundRecord::new(plate.id, 100, Some("B1".into()), None, warehouse, None, at(8)).unwrap();
        let mut line =
            InventoryLine::open(plate.id, receipt.batch_number.clone(), None, None, receipt.quantity, at(8))
                .unwrap();
        assert_eq!(line.quantity, 100);

        let mut request = OutboundRecord::request(&line, 30, warehouse, None, at(9)).unwrap();
        assert_eq!(request.status, OutboundStatus::Pending);
        assert_eq!(line.quantity, 100);

        request.approve(&mut line, admin, at(10)).unwrap();
        assert_eq!(line.quantity, 70);
        assert_eq!(request.status, OutboundStatus::Approved);
        assert_eq!(request.approver_id, Some(admin));
        assert_eq!(request.outbound_time, Some(at(10)));

        let second = request.approve(&mut line, admin, at(11));
        assert!(matches!(second, Err(DomainError::AlreadyDecided { .. })));
        assert_eq!(line.quantity, 70);
        assert_eq!(request.outbound_time, Some(at(10)));
    }

    /// A request beyond stock fails and produces no record
    #[test]
    fn test_request_beyond_stock_fails() {
        let plate = plate_6061();
        let line = InventoryLine::open(plate.id, Some("B1".into()), None, None, 70, at(8)).unwrap();

        let result = OutboundRecord::request(&line, 200, Uuid::new_v4(), None, at(9));
        assert_eq!(
            result,
            Err(DomainError::InsufficientStock {
                requested: 200,
                available: 70
            })
        );
    }

    /// Stock can drop between request and approval; approval re-checks it
    #[test]
    fn test_approval_rechecks_stock() {
        let plate = plate_6061();
        let mut line = InventoryLine::open(plate.id, None, None, None, 50, at(8)).unwrap();
        let mut first = OutboundRecord::request(&line, 40, Uuid::new_v4(), None, at(9)).unwrap();
        let mut second = OutboundRecord::request(&line, 40, Uuid::new_v4(), None, at(9)).unwrap();

        first.approve(&mut line, Uuid::new_v4(), at(10)).unwrap();
        let result = second.approve(&mut line, Uuid::new_v4(), at(10));

        assert!(matches!(result, Err(DomainError::InsufficientStock { .. })));
        assert_eq!(line.quantity, 10);
        assert!(second.is_pending());
    }

    #[test]
    fn test_reject_leaves_ledger_untouched() {
        let plate = plate_6061();
        let line = InventoryLine::open(plate.id, Some("B1".into()), None, None, 70, at(8)).unwrap();
        let before = line.clone();

        let mut request = OutboundRecord::request(&line, 30, Uuid::new_v4(), None, at(9)).unwrap();
        request.reject(Uuid::new_v4(), Some("not needed")).unwrap();

        assert_eq!(line, before);
        assert_eq!(request.status, OutboundStatus::Rejected);
        assert!(request.outbound_time.is_none());
    }

    #[test]
    fn test_rejected_request_cannot_be_approved() {
        let plate = plate_6061();
        let mut line = InventoryLine::open(plate.id, None, None, None, 70, at(8)).unwrap();
        let mut request = OutboundRecord::request(&line, 30, Uuid::new_v4(), None, at(9)).unwrap();
        request.reject(Uuid::new_v4(), None).unwrap();

        assert!(request.approve(&mut line, Uuid::new_v4(), at(10)).is_err());
        assert!(request.reject(Uuid::new_v4(), None).is_err());
        assert_eq!(line.quantity, 70);
        assert_eq!(request.status, OutboundStatus::Rejected);
    }

    /// Count 65 against a line holding 70
    #[test]
    fn test_reconcile_records_difference_and_overwrites() {
        let plate = plate_6061();
        let mut line = InventoryLine::open(plate.id, Some("B1".into()), None, None, 70, at(8)).unwrap();
        let checker = Uuid::new_v4();

        let check = InventoryCheck::reconcile(&mut line, 65, checker, None, at(12)).unwrap();

        assert_eq!(check.expected_quantity, 70);
        assert_eq!(check.actual_quantity, 65);
        assert_eq!(check.difference, -5);
        assert_eq!(check.inventory_id, line.id);
        assert_eq!(line.quantity, 65);
        assert_eq!(line.last_updated, at(12));
    }

    #[test]
    fn test_reconcile_rejects_negative_count() {
        let mut line = InventoryLine::open(Uuid::new_v4(), None, None, None, 70, at(8)).unwrap();
        assert!(InventoryCheck::reconcile(&mut line, -1, Uuid::new_v4(), None, at(12)).is_err());
        assert_eq!(line.quantity, 70);
    }

    #[test]
    fn test_review_task_goes_to_assignee_with_high_priority() {
        let plate = plate_6061();
        let line = InventoryLine::open(plate.id, None, None, None, 100, at(8)).unwrap();
        let applicant = Uuid::new_v4();
        let admin = Uuid::new_v4();
        let request = OutboundRecord::request(&line, 30, applicant, None, at(9)).unwrap();

        let task = request.review_task(&plate.label(), "Li Wei", admin, at(9));

        assert_eq!(task.assignee_id, admin);
        assert_eq!(task.creator_id, applicant);
        assert_eq!(task.priority, TaskPriority::High);
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.title.contains(&plate.label()));
    }

    #[test]
    fn test_derived_figures_follow_quantity() {
        let line = InventoryLine::open(Uuid::new_v4(), None, None, Some(5), 5, at(8)).unwrap();
        let figures = line.figures();
        assert_eq!(figures.available_quantity, 5);
        assert_eq!(figures.reserved_quantity, 0);
        assert_eq!(figures.defective_quantity, 0);
        assert!(figures.low_stock);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn quantity_strategy() -> impl Strategy<Value = i32> {
        1..10_000i32
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Every receipt adds exactly its quantity
        #[test]
        fn prop_receipts_accumulate(
            first in quantity_strategy(),
            more in prop::collection::vec(quantity_strategy(), 0..10)
        ) {
            let mut line = InventoryLine::open(Uuid::new_v4(), None, None, None, first, at(8)).unwrap();
            for q in &more {
                line.receive(*q, at(9)).unwrap();
            }
            let expected: i32 = first + more.iter().sum::<i32>();
            prop_assert_eq!(line.quantity, expected);
        }

        /// Withdrawals never drive a line negative
        #[test]
        fn prop_quantity_never_negative(
            start in quantity_strategy(),
            takes in prop::collection::vec(quantity_strategy(), 1..20)
        ) {
            let mut line = InventoryLine::open(Uuid::new_v4(), None, None, None, start, at(8)).unwrap();
            for q in &takes {
                let before = line.quantity;
                match line.withdraw(*q, at(9)) {
                    Ok(()) => prop_assert_eq!(line.quantity, before - q),
                    Err(_) => {
                        prop_assert!(*q > before);
                        prop_assert_eq!(line.quantity, before);
                    }
                }
                prop_assert!(line.quantity >= 0);
            }
        }

        /// Approval decrements exactly once regardless of retries
        #[test]
        fn prop_approval_decrements_once(
            stock in quantity_strategy(),
            retries in 1..5usize
        ) {
            let mut line = InventoryLine::open(Uuid::new_v4(), None, None, None, stock, at(8)).unwrap();
            let quantity = (stock / 2).max(1);
            let mut request = OutboundRecord::request(&line, quantity, Uuid::new_v4(), None, at(9)).unwrap();

            request.approve(&mut line, Uuid::new_v4(), at(10)).unwrap();
            for _ in 0..retries {
                prop_assert!(request.approve(&mut line, Uuid::new_v4(), at(11)).is_err());
            }
            prop_assert_eq!(line.quantity, stock - quantity);
        }

        /// Difference is always actual minus expected
        #[test]
        fn prop_reconcile_difference(
            stock in quantity_strategy(),
            counted in 0..10_000i32
        ) {
            let mut line = InventoryLine::open(Uuid::new_v4(), None, None, None, stock, at(8)).unwrap();
            let check = InventoryCheck::reconcile(&mut line, counted, Uuid::new_v4(), None, at(12)).unwrap();
            prop_assert_eq!(check.difference, counted - stock);
            prop_assert_eq!(line.quantity, counted);
        }

        /// Non-positive movement quantities are refused
        #[test]
        fn prop_non_positive_inbound_rejected(quantity in -1000..=0i32) {
            let result = InboundRecord::new(Uuid::new_v4(), quantity, None, None, Uuid::new_v4(), None, at(8));
            prop_assert!(result.is_err());
        }
    }
}
