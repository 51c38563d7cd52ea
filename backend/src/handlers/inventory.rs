//! HTTP handlers for the inventory ledger and physical counts

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{PaginatedResponse, Pagination};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::inventory::{
    CheckFilter, CheckOutcome, CreateCheckInput, InventoryCheckView, InventoryFilter,
    InventoryView,
};
use crate::services::InventoryService;
use crate::AppState;

/// List ledger lines
pub async fn list_inventory(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    Query(filter): Query<InventoryFilter>,
) -> AppResult<Json<PaginatedResponse<InventoryView>>> {
    let service = InventoryService::new(state.db);
    let lines = service.list(filter, pagination).await?;
    Ok(Json(lines))
}

/// Lines at or below their warning threshold
pub async fn list_warnings(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<PaginatedResponse<InventoryView>>> {
    let service = InventoryService::new(state.db);
    let lines = service.warnings(pagination).await?;
    Ok(Json(lines))
}

pub async fn get_inventory(
    State(state): State<AppState>,
    Path(inventory_id): Path<Uuid>,
) -> AppResult<Json<InventoryView>> {
    let service = InventoryService::new(state.db);
    let line = service.get(inventory_id).await?;
    Ok(Json(line))
}

/// Record a physical count; the caller is the checker
pub async fn create_check(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateCheckInput>,
) -> AppResult<(StatusCode, Json<CheckOutcome>)> {
    let service = InventoryService::new(state.db);
    let outcome = service
        .create_check(current_user.0.user_id, input, &state.clock)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn list_checks(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    Query(filter): Query<CheckFilter>,
) -> AppResult<Json<PaginatedResponse<InventoryCheckView>>> {
    let service = InventoryService::new(state.db);
    let checks = service.list_checks(filter, pagination).await?;
    Ok(Json(checks))
}
