//! HTTP handlers for inbound records

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use shared::{PaginatedResponse, Pagination};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::inbound::{
    CreateInboundInput, InboundFilter, InboundOutcome, InboundRecordView,
};
use crate::services::InboundService;
use crate::AppState;

/// Receive stock into the ledger
pub async fn create_inbound(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateInboundInput>,
) -> AppResult<(StatusCode, Json<InboundOutcome>)> {
    let service = InboundService::new(state.db);
    let outcome = service
        .create(
            current_user.0.user_id,
            input,
            &state.config.warehouse,
            &state.clock,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn list_inbound(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    Query(filter): Query<InboundFilter>,
) -> AppResult<Json<PaginatedResponse<InboundRecordView>>> {
    let service = InboundService::new(state.db);
    let records = service.list(filter, pagination).await?;
    Ok(Json(records))
}

pub async fn get_inbound(
    State(state): State<AppState>,
    Path(inbound_id): Path<Uuid>,
) -> AppResult<Json<InboundRecordView>> {
    let service = InboundService::new(state.db);
    let record = service.get(inbound_id).await?;
    Ok(Json(record))
}

/// Download matching inbound records as CSV
pub async fn export_inbound(
    State(state): State<AppState>,
    Query(filter): Query<InboundFilter>,
) -> AppResult<impl IntoResponse> {
    let service = InboundService::new(state.db);
    let body = service.export(filter).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"inbound_records.csv\"",
            ),
        ],
        body,
    ))
}
