//! HTTP handlers for outbound requests and their approval

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{PaginatedResponse, Pagination};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::outbound::{
    CreateOutboundInput, OutboundDecisionOutcome, OutboundFilter, OutboundRecordView,
    OutboundRequestOutcome, RejectOutboundInput,
};
use crate::services::OutboundService;
use crate::AppState;

/// Open a pending outbound request and its review task
pub async fn create_outbound(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateOutboundInput>,
) -> AppResult<(StatusCode, Json<OutboundRequestOutcome>)> {
    let service = OutboundService::new(state.db);
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

pub async fn list_outbound(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    Query(filter): Query<OutboundFilter>,
) -> AppResult<Json<PaginatedResponse<OutboundRecordView>>> {
    let service = OutboundService::new(state.db);
    let records = service.list(filter, pagination).await?;
    Ok(Json(records))
}

pub async fn get_outbound(
    State(state): State<AppState>,
    Path(outbound_id): Path<Uuid>,
) -> AppResult<Json<OutboundRecordView>> {
    let service = OutboundService::new(state.db);
    let record = service.get(outbound_id).await?;
    Ok(Json(record))
}

/// Approve a pending request; the caller is recorded as approver
pub async fn approve_outbound(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(outbound_id): Path<Uuid>,
) -> AppResult<Json<OutboundDecisionOutcome>> {
    let service = OutboundService::new(state.db);
    let outcome = service
        .approve(current_user.0.user_id, outbound_id, &state.clock)
        .await?;
    Ok(Json(outcome))
}

/// Reject a pending request; the body is optional
pub async fn reject_outbound(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(outbound_id): Path<Uuid>,
    input: Option<Json<RejectOutboundInput>>,
) -> AppResult<Json<OutboundDecisionOutcome>> {
    let input = input.map(|Json(input)| input).unwrap_or_default();
    let service = OutboundService::new(state.db);
    let outcome = service
        .reject(current_user.0.user_id, outbound_id, input)
        .await?;
    Ok(Json(outcome))
}
