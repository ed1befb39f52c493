use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use super::error::ApiError;
use crate::models::stats::{PerformanceStats, StatsQuery};
use crate::services::AppState;

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<PerformanceStats>, ApiError> {
    let stats = state
        .stats_service()
        .performance(query.user_id.as_deref())
        .await?;
    Ok(Json(stats))
}
