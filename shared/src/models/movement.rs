//! Inbound and outbound movement records and the outbound approval workflow

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::inventory::InventoryLine;
use super::task::{DispatchTask, TaskPriority};
use crate::error::{DomainError, DomainResult};
use crate::validation::ensure_positive_quantity;

/// Append-only record of received stock
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InboundRecord {
    pub id: Uuid,
    pub plate_id: Uuid,
    pub quantity: i32,
    pub batch_number: Option<String>,
    pub supplier: Option<String>,
    pub operator_id: Uuid,
    pub inbound_time: NaiveDateTime,
    pub note: Option<String>,
}

impl InboundRecord {
    pub fn new(
        plate_id: Uuid,
        quantity: i32,
        batch_number: Option<String>,
        supplier: Option<String>,
        operator_id: Uuid,
        note: Option<String>,
        now: NaiveDateTime,
    ) -> DomainResult<Self> {
        ensure_positive_quantity("quantity", quantity)?;
        Ok(Self {
            id: Uuid::new_v4(),
            plate_id,
            quantity,
            batch_number,
            supplier,
            operator_id,
            inbound_time: now,
            note,
        })
    }
}

/// Outbound request status; `approved` and `rejected` are terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(
    feature = "sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "outbound_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OutboundStatus {
    Pending,
    Approved,
    Rejected,
}

impl OutboundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboundStatus::Pending => "pending",
            OutboundStatus::Approved => "approved",
            OutboundStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for OutboundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to take stock out of one inventory line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OutboundRecord {
    pub id: Uuid,
    pub plate_id: Uuid,
    pub inventory_id: Uuid,
    pub quantity: i32,
    pub applicant_id: Uuid,
    pub approver_id: Option<Uuid>,
    pub status: OutboundStatus,
    pub outbound_time: Option<NaiveDateTime>,
    pub note: Option<String>,
    pub created_at: NaiveDateTime,
}

impl OutboundRecord {
    /// Open a pending request against `line`.
    ///
    /// Stock is checked but not reserved; approval re-checks it.
    pub fn request(
        line: &InventoryLine,
        quantity: i32,
        applicant_id: Uuid,
        note: Option<String>,
        now: NaiveDateTime,
    ) -> DomainResult<Self> {
        ensure_positive_quantity("quantity", quantity)?;
        line.ensure_covers(quantity)?;

        Ok(Self {
            id: Uuid::new_v4(),
            plate_id: line.plate_id,
            inventory_id: line.id,
            quantity,
            applicant_id,
            approver_id: None,
            status: OutboundStatus::Pending,
            outbound_time: None,
            note,
            created_at: now,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.status == OutboundStatus::Pending
    }

    fn ensure_pending(&self) -> DomainResult<()> {
        if !self.is_pending() {
            return Err(DomainError::AlreadyDecided {
                status: self.status.to_string(),
            });
        }
        Ok(())
    }

    /// Approve the request and take the stock out of `line`.
    ///
    /// Either every effect applies (status, approver, outbound time, ledger
    /// decrement) or none does.
    pub fn approve(
        &mut self,
        line: &mut InventoryLine,
        approver_id: Uuid,
        now: NaiveDateTime,
    ) -> DomainResult<()> {
        self.ensure_pending()?;
        if line.id != self.inventory_id {
            return Err(DomainError::validation(
                "inventory_id",
                "inventory line does not belong to this request",
            ));
        }
        line.withdraw(self.quantity, now)?;

        self.status = OutboundStatus::Approved;
        self.approver_id = Some(approver_id);
        self.outbound_time = Some(now);
        Ok(())
    }

    /// Reject the request; the ledger is never touched
    pub fn reject(&mut self, approver_id: Uuid, reason: Option<&str>) -> DomainResult<()> {
        self.ensure_pending()?;

        self.status = OutboundStatus::Rejected;
        self.approver_id = Some(approver_id);
        if let Some(reason) = reason.map(str::trim).filter(|r| !r.is_empty()) {
            let line = format!("拒绝原因: {}", reason);
            self.note = Some(match self.note.take() {
                Some(note) if !note.is_empty() => format!("{}\n{}", note, line),
                _ => line,
            });
        }
        Ok(())
    }

    /// Dispatch task asking `assignee_id` to review this request
    pub fn review_task(
        &self,
        plate_label: &str,
        applicant_name: &str,
        assignee_id: Uuid,
        now: NaiveDateTime,
    ) -> DispatchTask {
        let title = format!("出库审批: {} x {}", plate_label, self.quantity);
        let description = format!(
            "申请人: {}\n铝板: {}\n数量: {}\n备注: {}",
            applicant_name,
            plate_label,
            self.quantity,
            self.note.as_deref().unwrap_or("无"),
        );
        DispatchTask::new(
            title,
            Some(description),
            assignee_id,
            self.applicant_id,
            TaskPriority::High,
            None,
            now,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;
    use chrono::NaiveDate;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn stocked(quantity: i32) -> InventoryLine {
        InventoryLine::open(Uuid::new_v4(), Some("B1".into()), None, None, quantity, at(8)).unwrap()
    }

    #[test]
    fn test_inbound_rejects_zero() {
        let result = InboundRecord::new(Uuid::new_v4(), 0, None, None, Uuid::new_v4(), None, at(8));
        assert!(result.is_err());
    }

    #[test]
    fn test_request_is_pending_and_leaves_stock() {
        let line = stocked(100);
        let record = OutboundRecord::request(&line, 30, Uuid::new_v4(), None, at(9)).unwrap();
        assert_eq!(record.status, OutboundStatus::Pending);
        assert_eq!(record.inventory_id, line.id);
        assert_eq!(record.plate_id, line.plate_id);
        assert!(record.approver_id.is_none());
        assert!(record.outbound_time.is_none());
        assert_eq!(line.quantity, 100);
    }

    #[test]
    fn test_approve_against_wrong_line_rejected() {
        let line = stocked(100);
        let mut other = stocked(100);
        let mut record = OutboundRecord::request(&line, 30, Uuid::new_v4(), None, at(9)).unwrap();
        assert!(record.approve(&mut other, Uuid::new_v4(), at(10)).is_err());
        assert_eq!(other.quantity, 100);
        assert!(record.is_pending());
    }

    #[test]
    fn test_reject_appends_reason() {
        let line = stocked(100);
        let mut record =
            OutboundRecord::request(&line, 30, Uuid::new_v4(), Some("urgent".into()), at(9)).unwrap();
        record.reject(Uuid::new_v4(), Some("wrong batch")).unwrap();
        assert_eq!(record.note.as_deref(), Some("urgent\n拒绝原因: wrong batch"));
    }

    #[test]
    fn test_reject_without_note_or_reason() {
        let line = stocked(100);
        let mut record = OutboundRecord::request(&line, 30, Uuid::new_v4(), None, at(9)).unwrap();
        record.reject(Uuid::new_v4(), Some("  ")).unwrap();
        assert_eq!(record.note, None);
        assert_eq!(record.status, OutboundStatus::Rejected);
    }

    #[test]
    fn test_review_task_content() {
        let line = stocked(100);
        let applicant = Uuid::new_v4();
        let admin = Uuid::new_v4();
        let record = OutboundRecord::request(&line, 30, applicant, None, at(9)).unwrap();
        let task = record.review_task("6061 - 10mm", "Li Wei", admin, at(9));
        assert_eq!(task.title, "出库审批: 6061 - 10mm x 30");
        assert_eq!(task.priority, TaskPriority::High);
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.assignee_id, admin);
        assert_eq!(task.creator_id, applicant);
        assert!(task.due_date.is_none());
        let description = task.description.unwrap();
        assert!(description.contains("申请人: Li Wei"));
        assert!(description.ends_with("备注: 无"));
    }
}
