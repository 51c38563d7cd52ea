//! HTTP handlers for dashboard statistics

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use shared::{InventoryStatistics, Overview, TrendRange, TrendReport};

use crate::error::AppResult;
use crate::services::StatisticsService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub group_by: Option<String>,
}

pub async fn overview(State(state): State<AppState>) -> AppResult<Json<Overview>> {
    let service = StatisticsService::new(state.db);
    let overview = service.overview(&state.clock).await?;
    Ok(Json(overview))
}

pub async fn inventory_statistics(
    State(state): State<AppState>,
) -> AppResult<Json<InventoryStatistics>> {
    let service = StatisticsService::new(state.db);
    let stats = service.inventory().await?;
    Ok(Json(stats))
}

/// Inbound/outbound trend; `start_date` and `end_date` are required
pub async fn trend(
    State(state): State<AppState>,
    Query(query): Query<TrendQuery>,
) -> AppResult<Json<TrendReport>> {
    let range = TrendRange::parse(
        query.start_date.as_deref(),
        query.end_date.as_deref(),
        query.group_by.as_deref(),
    )?;
    let service = StatisticsService::new(state.db);
    let report = service.trend(range).await?;
    Ok(Json(report))
}
