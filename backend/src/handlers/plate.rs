//! HTTP handlers for the plate catalog

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{PaginatedResponse, Pagination, Plate};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::plate::{CreatePlateInput, PlateFilter, UpdatePlateInput};
use crate::services::PlateService;
use crate::AppState;

pub async fn list_plates(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    Query(filter): Query<PlateFilter>,
) -> AppResult<Json<PaginatedResponse<Plate>>> {
    let service = PlateService::new(state.db);
    let plates = service.list(filter, pagination).await?;
    Ok(Json(plates))
}

pub async fn create_plate(
    State(state): State<AppState>,
    Json(input): Json<CreatePlateInput>,
) -> AppResult<(StatusCode, Json<Plate>)> {
    let service = PlateService::new(state.db);
    let plate = service.create(input).await?;
    Ok((StatusCode::CREATED, Json(plate)))
}

pub async fn get_plate(
    State(state): State<AppState>,
    Path(plate_id): Path<Uuid>,
) -> AppResult<Json<Plate>> {
    let service = PlateService::new(state.db);
    let plate = service.get(plate_id).await?;
    Ok(Json(plate))
}

pub async fn update_plate(
    State(state): State<AppState>,
    Path(plate_id): Path<Uuid>,
    Json(input): Json<UpdatePlateInput>,
) -> AppResult<Json<Plate>> {
    let service = PlateService::new(state.db);
    let plate = service.update(plate_id, input).await?;
    Ok(Json(plate))
}

/// Delete a plate that has no stock or movement history
pub async fn delete_plate(
    State(state): State<AppState>,
    Path(plate_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = PlateService::new(state.db);
    service.delete(plate_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
