//! Dispatch task models

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Task status. Any status may be set from any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(
    feature = "sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "task_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    /// Statuses counted as open work on the dashboard
    pub fn is_open(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::InProgress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(
    feature = "sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "task_priority", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    High,
    #[default]
    Medium,
    Low,
}

/// An assignable unit of work
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DispatchTask {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub assignee_id: Uuid,
    pub creator_id: Uuid,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

impl DispatchTask {
    pub fn new(
        title: String,
        description: Option<String>,
        assignee_id: Uuid,
        creator_id: Uuid,
        priority: TaskPriority,
        due_date: Option<NaiveDateTime>,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            description,
            assignee_id,
            creator_id,
            status: TaskStatus::Pending,
            priority,
            due_date,
            created_at: now,
            completed_at: None,
        }
    }

    /// Move to `status`; completion is stamped on entering `completed`
    /// and cleared on leaving it.
    pub fn set_status(&mut self, status: TaskStatus, now: NaiveDateTime) {
        self.status = status;
        self.completed_at = match status {
            TaskStatus::Completed => Some(now),
            _ => None,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn task() -> DispatchTask {
        DispatchTask::new(
            "Move B1 to rack 3".into(),
            None,
            Uuid::new_v4(),
            Uuid::new_v4(),
            TaskPriority::default(),
            None,
            at(8),
        )
    }

    #[test]
    fn test_new_task_defaults() {
        let t = task();
        assert_eq!(t.status, TaskStatus::Pending);
        assert_eq!(t.priority, TaskPriority::Medium);
        assert!(t.completed_at.is_none());
    }

    #[test]
    fn test_completion_stamp_set_and_cleared() {
        let mut t = task();
        t.set_status(TaskStatus::Completed, at(10));
        assert_eq!(t.completed_at, Some(at(10)));
        t.set_status(TaskStatus::InProgress, at(11));
        assert_eq!(t.completed_at, None);
    }

    #[test]
    fn test_pending_straight_to_completed_allowed() {
        let mut t = task();
        t.set_status(TaskStatus::Completed, at(9));
        assert_eq!(t.status, TaskStatus::Completed);
        t.set_status(TaskStatus::Pending, at(12));
        assert_eq!(t.status, TaskStatus::Pending);
    }

    #[test]
    fn test_open_statuses() {
        assert!(TaskStatus::Pending.is_open());
        assert!(TaskStatus::InProgress.is_open());
        assert!(!TaskStatus::Completed.is_open());
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_string(&TaskStatus::InProgress).unwrap(), "\"in_progress\"");
    }
}
