//! HTTP handlers for dispatch tasks

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{PaginatedResponse, Pagination};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::task::{
    AssignTaskInput, CreateTaskInput, TaskFilter, TaskView, UpdateTaskInput,
    UpdateTaskStatusInput,
};
use crate::services::TaskService;
use crate::AppState;

pub async fn list_tasks(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    Query(filter): Query<TaskFilter>,
) -> AppResult<Json<PaginatedResponse<TaskView>>> {
    let service = TaskService::new(state.db);
    let tasks = service.list(filter, pagination).await?;
    Ok(Json(tasks))
}

/// Create a task; the caller is the creator
pub async fn create_task(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateTaskInput>,
) -> AppResult<(StatusCode, Json<TaskView>)> {
    let service = TaskService::new(state.db);
    let task = service
        .create(current_user.0.user_id, input, &state.clock)
        .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> AppResult<Json<TaskView>> {
    let service = TaskService::new(state.db);
    let task = service.get(task_id).await?;
    Ok(Json(task))
}

pub async fn update_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    Json(input): Json<UpdateTaskInput>,
) -> AppResult<Json<TaskView>> {
    let service = TaskService::new(state.db);
    let task = service.update(task_id, input).await?;
    Ok(Json(task))
}

pub async fn update_task_status(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    Json(input): Json<UpdateTaskStatusInput>,
) -> AppResult<Json<TaskView>> {
    let service = TaskService::new(state.db);
    let task = service
        .update_status(task_id, input.status, &state.clock)
        .await?;
    Ok(Json(task))
}

pub async fn assign_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    Json(input): Json<AssignTaskInput>,
) -> AppResult<Json<TaskView>> {
    let service = TaskService::new(state.db);
    let task = service.assign(task_id, input.assignee_id).await?;
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = TaskService::new(state.db);
    service.delete(task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
