//! Dispatch task service

use serde::{Deserialize, Serialize};
use shared::{
    deserialize_some, ensure_not_blank, parse_datetime, DispatchTask, LocalClock,
    PaginatedResponse, Pagination, TaskPriority, TaskStatus,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Dispatch task service
#[derive(Clone)]
pub struct TaskService {
    db: PgPool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskInput {
    #[validate(length(min = 1, max = 200, message = "title is required"))]
    pub title: String,
    pub description: Option<String>,
    pub assignee_id: Uuid,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<String>,
}

/// Partial update. `description` and `due_date` accept an explicit null to clear.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskInput {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    pub priority: Option<TaskPriority>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub due_date: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskStatusInput {
    pub status: TaskStatus,
}

#[derive(Debug, Deserialize)]
pub struct AssignTaskInput {
    pub assignee_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<Uuid>,
    pub creator_id: Option<Uuid>,
}

/// Task joined with assignee and creator names
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TaskView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub task: DispatchTask,
    pub assignee_name: String,
    pub creator_name: String,
}

const TASK_COLUMNS: &str = "id, title, description, assignee_id, creator_id, status, priority, due_date, created_at, completed_at";

const VIEW_SELECT: &str = r#"
    SELECT t.id, t.title, t.description, t.assignee_id, t.creator_id, t.status,
           t.priority, t.due_date, t.created_at, t.completed_at,
           a.real_name AS assignee_name, c.real_name AS creator_name
    FROM dispatch_tasks t
    JOIN users a ON a.id = t.assignee_id
    JOIN users c ON c.id = t.creator_id
"#;

impl TaskService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        creator_id: Uuid,
        input: CreateTaskInput,
        clock: &LocalClock,
    ) -> AppResult<TaskView> {
        input.validate()?;
        ensure_not_blank("title", &input.title)?;
        let due_date = input
            .due_date
            .as_deref()
            .map(|d| parse_datetime("due_date", d))
            .transpose()?;

        let mut conn = self.db.acquire().await?;
        ensure_user_exists(&mut conn, input.assignee_id, "Assignee").await?;

        let now = clock.now();
        let mut task = DispatchTask::new(
            input.title.trim().to_string(),
            input.description,
            input.assignee_id,
            creator_id,
            input.priority.unwrap_or_default(),
            due_date,
            now,
        );
        if let Some(status) = input.status {
            task.set_status(status, now);
        }

        insert_task(&mut conn, &task).await?;
        tracing::info!(task_id = %task.id, assignee_id = %task.assignee_id, "task created");

        self.get(task.id).await
    }

    /// Tasks, newest first
    pub async fn list(
        &self,
        filter: TaskFilter,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<TaskView>> {
        let pagination = pagination.normalized();

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM dispatch_tasks t
            WHERE ($1::task_status IS NULL OR t.status = $1)
              AND ($2::task_priority IS NULL OR t.priority = $2)
              AND ($3::uuid IS NULL OR t.assignee_id = $3)
              AND ($4::uuid IS NULL OR t.creator_id = $4)
            "#,
        )
        .bind(filter.status)
        .bind(filter.priority)
        .bind(filter.assignee_id)
        .bind(filter.creator_id)
        .fetch_one(&self.db)
        .await?;

        let tasks = sqlx::query_as::<_, TaskView>(&format!(
            r#"
            {}
            WHERE ($1::task_status IS NULL OR t.status = $1)
              AND ($2::task_priority IS NULL OR t.priority = $2)
              AND ($3::uuid IS NULL OR t.assignee_id = $3)
              AND ($4::uuid IS NULL OR t.creator_id = $4)
            ORDER BY t.created_at DESC
            LIMIT $5 OFFSET $6
            "#,
            VIEW_SELECT
        ))
        .bind(filter.status)
        .bind(filter.priority)
        .bind(filter.assignee_id)
        .bind(filter.creator_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(tasks, pagination, total))
    }

    pub async fn get(&self, task_id: Uuid) -> AppResult<TaskView> {
        sqlx::query_as::<_, TaskView>(&format!("{} WHERE t.id = $1", VIEW_SELECT))
            .bind(task_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Task".to_string()))
    }

    pub async fn update(&self, task_id: Uuid, input: UpdateTaskInput) -> AppResult<TaskView> {
        input.validate()?;
        let mut task = self.get(task_id).await?.task;

        if let Some(title) = input.title {
            ensure_not_blank("title", &title)?;
            task.title = title.trim().to_string();
        }
        if let Some(description) = input.description {
            task.description = description;
        }
        if let Some(priority) = input.priority {
            task.priority = priority;
        }
        if let Some(due_date) = input.due_date {
            task.due_date = match due_date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
                Some(d) => Some(parse_datetime("due_date", d)?),
                None => None,
            };
        }

        sqlx::query(
            "UPDATE dispatch_tasks SET title = $2, description = $3, priority = $4, due_date = $5 WHERE id = $1",
        )
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.priority)
        .bind(task.due_date)
        .execute(&self.db)
        .await?;

        self.get(task_id).await
    }

    /// Set any status; entering `completed` stamps the completion time
    pub async fn update_status(
        &self,
        task_id: Uuid,
        status: TaskStatus,
        clock: &LocalClock,
    ) -> AppResult<TaskView> {
        let mut task = self.get(task_id).await?.task;
        let previous = task.status;
        task.set_status(status, clock.now());

        sqlx::query("UPDATE dispatch_tasks SET status = $2, completed_at = $3 WHERE id = $1")
            .bind(task.id)
            .bind(task.status)
            .bind(task.completed_at)
            .execute(&self.db)
            .await?;

        tracing::info!(task_id = %task_id, from = ?previous, to = ?status, "task status changed");
        self.get(task_id).await
    }

    pub async fn assign(&self, task_id: Uuid, assignee_id: Uuid) -> AppResult<TaskView> {
        self.get(task_id).await?;

        let mut conn = self.db.acquire().await?;
        ensure_user_exists(&mut conn, assignee_id, "Assignee").await?;

        sqlx::query("UPDATE dispatch_tasks SET assignee_id = $2 WHERE id = $1")
            .bind(task_id)
            .bind(assignee_id)
            .execute(&mut *conn)
            .await?;

        self.get(task_id).await
    }

    pub async fn delete(&self, task_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM dispatch_tasks WHERE id = $1")
            .bind(task_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Task".to_string()));
        }
        Ok(())
    }
}

async fn ensure_user_exists(conn: &mut PgConnection, user_id: Uuid, what: &str) -> AppResult<()> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(user_id)
        .fetch_one(conn)
        .await?;

    if !exists {
        return Err(AppError::NotFound(what.to_string()));
    }
    Ok(())
}

/// Insert a task row within the caller's connection or transaction
pub async fn insert_task(conn: &mut PgConnection, task: &DispatchTask) -> AppResult<()> {
    sqlx::query(&format!(
        "INSERT INTO dispatch_tasks ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        TASK_COLUMNS
    ))
    .bind(task.id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.assignee_id)
    .bind(task.creator_id)
    .bind(task.status)
    .bind(task.priority)
    .bind(task.due_date)
    .bind(task.created_at)
    .bind(task.completed_at)
    .execute(conn)
    .await?;
    Ok(())
}
